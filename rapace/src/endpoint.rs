use std::sync::Arc;

use rapace_core::{Engine, EndpointConfig, Middleware, Side};
use rapace_registry::{MethodKind, Registry, RegistryError, RpcError, ServiceContract};
use rapace_tracing::Diagnostics;
use rapace_transport::Transport;
use rapace_wire::MethodKey;

use crate::call::{BidirectionalCallBuilder, ClientStreamCallBuilder, ServerStreamCallBuilder, UnaryCallBuilder};

/// The user-facing facade: registers service contracts and middleware, and
/// builds calls of the four patterns (§4.6).
///
/// Owns the [`Engine`] exclusively; the engine in turn owns the transport,
/// the registry, and every live logical stream.
pub struct Endpoint<T: Transport> {
    engine: Arc<Engine<T>>,
    registry: Arc<Registry>,
}

impl<T: Transport + 'static> Endpoint<T> {
    /// Wraps `transport` and immediately starts demultiplexing inbound
    /// frames. Register services with [`Endpoint::register_service`] before
    /// the peer can be expected to reach them — registration after calls
    /// start arriving only races the first few `BEGIN`s, since the registry
    /// is a read-write lock, not a one-time setup barrier.
    pub fn new(transport: T, side: Side, config: EndpointConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let engine = Engine::new(transport, Arc::clone(&registry), side, config);
        engine.spawn_read_loop();
        Self { engine, registry }
    }

    pub fn with_diagnostics(transport: T, side: Side, config: EndpointConfig, diagnostics: Arc<dyn Diagnostics>) -> Self {
        let registry = Arc::new(Registry::new());
        let engine = Engine::with_diagnostics(transport, Arc::clone(&registry), side, config, diagnostics);
        engine.spawn_read_loop();
        Self { engine, registry }
    }

    pub fn register_service(&self, contract: ServiceContract) -> Result<(), RegistryError> {
        self.registry.register_service(contract)
    }

    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.engine.add_middleware(middleware);
    }

    pub fn unary_request<Req, Resp>(&self, service: &str, method: &str) -> UnaryCallBuilder<T, Req, Resp> {
        UnaryCallBuilder::new(Arc::clone(&self.engine), self.method_key(service, method, MethodKind::Unary))
    }

    pub fn server_stream<Req, Resp>(&self, service: &str, method: &str) -> ServerStreamCallBuilder<T, Req, Resp> {
        ServerStreamCallBuilder::new(
            Arc::clone(&self.engine),
            self.method_key(service, method, MethodKind::ServerStreaming),
        )
    }

    pub fn client_stream<Req, Resp>(&self, service: &str, method: &str) -> ClientStreamCallBuilder<T, Req, Resp> {
        ClientStreamCallBuilder::new(
            Arc::clone(&self.engine),
            self.method_key(service, method, MethodKind::ClientStreaming),
        )
    }

    pub fn bidirectional_stream<Req, Resp>(&self, service: &str, method: &str) -> BidirectionalCallBuilder<T, Req, Resp> {
        BidirectionalCallBuilder::new(
            Arc::clone(&self.engine),
            self.method_key(service, method, MethodKind::Bidirectional),
        )
    }

    /// Resolves `(service, method)` and, if locally registered, validates
    /// its kind matches the builder being constructed (§4.6,
    /// `METHOD_TYPE_MISMATCH`). A method not registered locally is assumed
    /// to exist only on the peer and is allowed through; the peer's own
    /// registry is the authority in that case.
    fn method_key(&self, service: &str, method: &str, expected: MethodKind) -> Result<MethodKey, RpcError> {
        if let Some(contract) = self.registry.lookup(service, method) {
            if contract.kind != expected {
                return Err(RpcError::MethodTypeMismatch {
                    service: service.to_string(),
                    method: method.to_string(),
                    expected,
                    found: contract.kind,
                });
            }
        }
        Ok(MethodKey::new(service, method))
    }

    /// Cancels every open stream with `STATUS(CANCELLED)` locally and closes
    /// the transport. Further call builder invocations fail with
    /// `UNAVAILABLE`.
    pub async fn close(&self) {
        self.engine.close().await;
    }
}
