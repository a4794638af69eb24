//! Common imports for building a service on top of rapace.

pub use crate::{CallStream, Endpoint, EndpointConfig, Side};
pub use rapace_registry::{BytesCodec, Codec, JsonCodec, MethodMetadata, RpcError, ServiceContract};
