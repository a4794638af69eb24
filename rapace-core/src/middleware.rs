//! The middleware chain wrapping the application-visible request/response
//! exchange (§4.5). Operates on already-encoded message bytes: the engine is
//! generic over application types, so interception happens at the boundary
//! it actually owns rather than on decoded values.

use std::sync::Arc;

use rapace_registry::RpcError;

/// A stateless interceptor. Both hooks default to passthrough so a
/// middleware only needs to implement the side it cares about.
pub trait Middleware: Send + Sync + 'static {
    fn process_request(
        &self,
        _service: &str,
        _method: &str,
        request: Vec<u8>,
    ) -> Result<Vec<u8>, RpcError> {
        Ok(request)
    }

    fn process_response(
        &self,
        _service: &str,
        _method: &str,
        response: Vec<u8>,
    ) -> Result<Vec<u8>, RpcError> {
        Ok(response)
    }
}

/// An ordered chain of [`Middleware`]. Registration order is outer wrapping
/// order: the first middleware added sees the raw outbound request first and
/// the final inbound response last.
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn process_request(
        &self,
        service: &str,
        method: &str,
        mut request: Vec<u8>,
    ) -> Result<Vec<u8>, RpcError> {
        for middleware in &self.middlewares {
            request = middleware.process_request(service, method, request)?;
        }
        Ok(request)
    }

    pub fn process_response(
        &self,
        service: &str,
        method: &str,
        mut response: Vec<u8>,
    ) -> Result<Vec<u8>, RpcError> {
        for middleware in self.middlewares.iter().rev() {
            response = middleware.process_response(service, method, response)?;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Prefix(&'static str);

    impl Middleware for Prefix {
        fn process_request(
            &self,
            _service: &str,
            _method: &str,
            mut request: Vec<u8>,
        ) -> Result<Vec<u8>, RpcError> {
            let mut out = self.0.as_bytes().to_vec();
            out.append(&mut request);
            Ok(out)
        }
    }

    #[test]
    fn request_hooks_apply_in_registration_order() {
        let mut chain = MiddlewareChain::default();
        chain.push(Arc::new(Prefix("A")));
        chain.push(Arc::new(Prefix("B")));
        let out = chain.process_request("Svc", "M", b"x".to_vec()).unwrap();
        assert_eq!(out, b"BAx".to_vec());
    }
}
