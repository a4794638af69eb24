//! Service contracts, method handlers, codecs, and the registry that ties
//! `(service, method)` names to them.

mod codec;
mod error;
mod method;
mod registry;
mod service;

pub use codec::{BytesCodec, Codec, JsonCodec};
pub use error::{CodecError, ErrorCode, RpcError};
pub use method::{
    bidirectional, client_streaming, server_streaming, unary, DecodedStream, Handler,
    HandlerItem, MessageStream, MethodContract, MethodKind, MethodMetadata,
};
pub use registry::{Registry, RegistryError};
pub use service::{ServiceContract, ServiceRegistrar};

pub use rapace_wire::{Envelope, MethodKey, Status, StatusCode};
