//! Service contracts, built with a registrar rather than by subclassing.
//!
//! The design notes call out the source's reliance on a base class whose
//! subclasses override `setup`; the resolution adopted here is a
//! builder-style [`ServiceContract::define`] that hands the caller a
//! [`ServiceRegistrar`] to add methods to.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{MethodContract, MethodKind, MethodMetadata, RegistryError};

/// A service's collection of method contracts, built once and then
/// immutable.
pub struct ServiceContract {
    pub name: String,
    methods: HashMap<String, Arc<MethodContract>>,
}

impl ServiceContract {
    /// Build a service contract by running `build_fn` against a fresh
    /// [`ServiceRegistrar`].
    ///
    /// ```ignore
    /// let contract = ServiceContract::define("Echo", |svc| {
    ///     svc.unary::<String, String, JsonCodec, JsonCodec, _, _>(
    ///         "Say",
    ///         MethodMetadata::default(),
    ///         |req| async move { Ok(req) },
    ///     );
    /// });
    /// ```
    pub fn define(name: impl Into<String>, build_fn: impl FnOnce(&mut ServiceRegistrar)) -> Self {
        let name = name.into();
        let mut registrar = ServiceRegistrar {
            service_name: name.clone(),
            methods: HashMap::new(),
        };
        build_fn(&mut registrar);
        Self {
            name,
            methods: registrar.methods,
        }
    }

    pub fn lookup(&self, method_name: &str) -> Option<Arc<MethodContract>> {
        self.methods.get(method_name).cloned()
    }

    pub fn methods(&self) -> impl Iterator<Item = &Arc<MethodContract>> {
        self.methods.values()
    }
}

/// Handed to the `build_fn` passed to [`ServiceContract::define`]; adds one
/// method per call.
pub struct ServiceRegistrar {
    service_name: String,
    methods: HashMap<String, Arc<MethodContract>>,
}

impl ServiceRegistrar {
    fn insert(
        &mut self,
        method_name: &str,
        kind: MethodKind,
        metadata: MethodMetadata,
        handler: Arc<dyn crate::Handler>,
    ) -> Result<(), RegistryError> {
        if self.methods.contains_key(method_name) {
            return Err(RegistryError::DuplicateMethod {
                service: self.service_name.clone(),
                method: method_name.to_string(),
            });
        }
        self.methods.insert(
            method_name.to_string(),
            Arc::new(MethodContract {
                service_name: self.service_name.clone(),
                method_name: method_name.to_string(),
                kind,
                metadata,
                handler,
            }),
        );
        Ok(())
    }

    /// Registers a unary method. Panics on a duplicate method name within
    /// this service, since `build_fn` is user-authored setup code, not
    /// runtime input — mirrors `registerMethod`'s `DUPLICATE_METHOD` failure
    /// but surfaces it immediately rather than deferring to `Registry`.
    pub fn unary<Req, Resp, ReqC, RespC, F, Fut>(
        &mut self,
        method_name: &str,
        metadata: MethodMetadata,
        f: F,
    ) where
        Req: Send + 'static,
        Resp: Send + 'static,
        ReqC: crate::Codec<Req>,
        RespC: crate::Codec<Resp>,
        F: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Resp, crate::RpcError>> + Send + 'static,
    {
        let handler = crate::method::unary::<Req, Resp, ReqC, RespC, F, Fut>(f);
        self.insert(method_name, MethodKind::Unary, metadata, handler)
            .expect("duplicate method name within service setup");
    }

    pub fn server_streaming<Req, Resp, ReqC, RespC, F, S>(
        &mut self,
        method_name: &str,
        metadata: MethodMetadata,
        f: F,
    ) where
        Req: Send + 'static,
        Resp: Send + 'static,
        ReqC: crate::Codec<Req>,
        RespC: crate::Codec<Resp>,
        F: Fn(Req) -> S + Clone + Send + Sync + 'static,
        S: futures_core::Stream<Item = Result<Resp, crate::RpcError>> + Send + 'static,
    {
        let handler = crate::method::server_streaming::<Req, Resp, ReqC, RespC, F, S>(f);
        self.insert(method_name, MethodKind::ServerStreaming, metadata, handler)
            .expect("duplicate method name within service setup");
    }

    pub fn client_streaming<Req, Resp, ReqC, RespC, F, Fut>(
        &mut self,
        method_name: &str,
        metadata: MethodMetadata,
        f: F,
    ) where
        Req: Send + 'static,
        Resp: Send + 'static,
        ReqC: crate::Codec<Req>,
        RespC: crate::Codec<Resp>,
        F: Fn(crate::DecodedStream<Req>) -> Fut + Clone + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Resp, crate::RpcError>> + Send + 'static,
    {
        let handler = crate::method::client_streaming::<Req, Resp, ReqC, RespC, F, Fut>(f);
        self.insert(method_name, MethodKind::ClientStreaming, metadata, handler)
            .expect("duplicate method name within service setup");
    }

    pub fn bidirectional<Req, Resp, ReqC, RespC, F, S>(
        &mut self,
        method_name: &str,
        metadata: MethodMetadata,
        f: F,
    ) where
        Req: Send + 'static,
        Resp: Send + 'static,
        ReqC: crate::Codec<Req>,
        RespC: crate::Codec<Resp>,
        F: Fn(crate::DecodedStream<Req>) -> S + Clone + Send + Sync + 'static,
        S: futures_core::Stream<Item = Result<Resp, crate::RpcError>> + Send + 'static,
    {
        let handler = crate::method::bidirectional::<Req, Resp, ReqC, RespC, F, S>(f);
        self.insert(method_name, MethodKind::Bidirectional, metadata, handler)
            .expect("duplicate method name within service setup");
    }
}
