#![doc = include_str!("../README.md")]

mod call;
mod endpoint;
pub mod prelude;

pub use call::{
    BidirectionalCallBuilder, CallStream, ClientStreamCallBuilder, ServerStreamCallBuilder, UnaryCallBuilder,
};
pub use endpoint::Endpoint;

pub use rapace_core::{EndpointConfig, Middleware, MiddlewareChain, Side};
pub use rapace_registry::{
    BytesCodec, Codec, ErrorCode, JsonCodec, MethodKind, MethodMetadata, Registry, RegistryError,
    RpcError, ServiceContract, ServiceRegistrar,
};
pub use rapace_tracing::{DiagEvent, Diagnostics, NullDiagnostics, TracingDiagnostics};
pub use rapace_transport::{Transport, TransportError};
pub use rapace_wire::{Envelope, MethodKey, Status, StatusCode};
