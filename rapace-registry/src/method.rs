//! Method contracts and the handler shapes that back them.
//!
//! Per the design notes, a handler is represented uniformly as a function
//! from an inbound message sequence to an outbound message sequence; the
//! four call patterns differ only in how many items that sequence carries,
//! not in what a handler fundamentally is. [`Handler`] captures that
//! uniform shape; the `unary`/`server_streaming`/`client_streaming`/
//! `bidirectional` constructors below are ergonomic adapters from idiomatic
//! Rust function shapes onto it.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use futures_util::stream::{self, StreamExt};

use crate::{Codec, RpcError};

/// An already-encoded application message flowing through a [`Handler`], or
/// the error that ends its stream.
pub type HandlerItem = Result<Vec<u8>, RpcError>;

/// A boxed, pinned, send stream of [`HandlerItem`]s.
pub type MessageStream = Pin<Box<dyn Stream<Item = HandlerItem> + Send>>;

/// A boxed, pinned, send stream of decoded application messages.
pub type DecodedStream<T> = Pin<Box<dyn Stream<Item = Result<T, RpcError>> + Send>>;

/// The call pattern a method implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Unary,
    ServerStreaming,
    ClientStreaming,
    Bidirectional,
}

/// Declarative, per-method metadata (§6.4). Unknown keys are preserved in
/// `extra` and exposed to middleware, but are opaque to the core.
#[derive(Debug, Clone, Default)]
pub struct MethodMetadata {
    pub timeout_ms: Option<u64>,
    pub requires_auth: bool,
    pub permissions: Vec<String>,
    pub cacheable: bool,
    pub cache_timeout_ms: Option<u64>,
    pub retry_count: Option<u32>,
    pub deprecated: bool,
    pub since: Option<String>,
    pub extra: HashMap<String, String>,
}

/// A type-erased RPC handler: takes the decoded (well-formed, per the call
/// pattern's cardinality) inbound message sequence and produces the
/// outbound one.
///
/// Cardinality enforcement (e.g. rejecting a second unary request) is a
/// protocol concern owned by the stream state machines, not by `Handler`
/// implementations — by the time `invoke` runs, the inbound sequence is
/// already well-formed for the method's kind.
pub trait Handler: Send + Sync {
    fn invoke(&self, inbound: MessageStream) -> MessageStream;
}

/// Immutable description of one callable operation.
pub struct MethodContract {
    pub service_name: String,
    pub method_name: String,
    pub kind: MethodKind,
    pub metadata: MethodMetadata,
    pub handler: Arc<dyn Handler>,
}

impl MethodContract {
    pub fn key(&self) -> (String, String) {
        (self.service_name.clone(), self.method_name.clone())
    }
}

impl std::fmt::Debug for MethodContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodContract")
            .field("service_name", &self.service_name)
            .field("method_name", &self.method_name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn missing_request() -> RpcError {
    RpcError::status(crate::ErrorCode::InvalidArgument, "missing request")
}

/// Adapts `f: Fn(Req) -> Fut` into a [`Handler`] for a unary method.
///
/// `invoke` takes exactly the first inbound item (the state machine
/// guarantees there is exactly one), decodes it, awaits `f`, and encodes the
/// single response.
pub fn unary<Req, Resp, ReqC, RespC, F, Fut>(f: F) -> Arc<dyn Handler>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
{
    Arc::new(UnaryHandler {
        f,
        _marker: PhantomData::<(Req, Resp, ReqC, RespC)>,
    })
}

struct UnaryHandler<Req, Resp, ReqC, RespC, F> {
    f: F,
    _marker: PhantomData<(Req, Resp, ReqC, RespC)>,
}

impl<Req, Resp, ReqC, RespC, F, Fut> Handler for UnaryHandler<Req, Resp, ReqC, RespC, F>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
{
    fn invoke(&self, mut inbound: MessageStream) -> MessageStream {
        let call = self.f.clone();
        Box::pin(stream::once(async move {
            let payload = inbound.next().await.ok_or_else(missing_request)??;
            let request = ReqC::decode(&payload)?;
            let response = call(request).await?;
            Ok(RespC::encode(&response)?)
        }))
    }
}

/// Adapts `f: Fn(Req) -> S` into a [`Handler`] for a server-streaming
/// method: one decoded request in, a lazily-produced response stream out.
pub fn server_streaming<Req, Resp, ReqC, RespC, F, S>(f: F) -> Arc<dyn Handler>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(Req) -> S + Clone + Send + Sync + 'static,
    S: Stream<Item = Result<Resp, RpcError>> + Send + 'static,
{
    Arc::new(ServerStreamingHandler {
        f,
        _marker: PhantomData::<(Req, Resp, ReqC, RespC)>,
    })
}

struct ServerStreamingHandler<Req, Resp, ReqC, RespC, F> {
    f: F,
    _marker: PhantomData<(Req, Resp, ReqC, RespC)>,
}

impl<Req, Resp, ReqC, RespC, F, S> Handler for ServerStreamingHandler<Req, Resp, ReqC, RespC, F>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(Req) -> S + Clone + Send + Sync + 'static,
    S: Stream<Item = Result<Resp, RpcError>> + Send + 'static,
{
    fn invoke(&self, mut inbound: MessageStream) -> MessageStream {
        let call = self.f.clone();
        let first = stream::once(async move {
            let payload = inbound.next().await.ok_or_else(missing_request)??;
            let request = ReqC::decode(&payload)?;
            Ok::<_, RpcError>(call(request))
        });

        Box::pin(first.flat_map(|result| match result {
            Ok(responses) => {
                let encoded = responses.map(|r| r.and_then(|v| Ok(RespC::encode(&v)?)));
                Box::pin(encoded) as MessageStream
            }
            Err(e) => Box::pin(stream::once(async move { Err(e) })) as MessageStream,
        }))
    }
}

/// Adapts `f: Fn(inbound decoded stream) -> Fut` into a [`Handler`] for a
/// client-streaming method: N decoded requests in, one encoded response out.
pub fn client_streaming<Req, Resp, ReqC, RespC, F, Fut>(f: F) -> Arc<dyn Handler>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(DecodedStream<Req>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
{
    Arc::new(ClientStreamingHandler {
        f,
        _marker: PhantomData::<(Req, Resp, ReqC, RespC)>,
    })
}

struct ClientStreamingHandler<Req, Resp, ReqC, RespC, F> {
    f: F,
    _marker: PhantomData<(Req, Resp, ReqC, RespC)>,
}

impl<Req, Resp, ReqC, RespC, F, Fut> Handler for ClientStreamingHandler<Req, Resp, ReqC, RespC, F>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(DecodedStream<Req>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, RpcError>> + Send + 'static,
{
    fn invoke(&self, inbound: MessageStream) -> MessageStream {
        let call = self.f.clone();
        let decoded: DecodedStream<Req> =
            Box::pin(inbound.map(|item| item.and_then(|bytes| Ok(ReqC::decode(&bytes)?))));
        Box::pin(stream::once(async move {
            let response = call(decoded).await?;
            Ok(RespC::encode(&response)?)
        }))
    }
}

/// Adapts `f: Fn(inbound decoded stream) -> S` into a [`Handler`] for a
/// bidirectional-streaming method.
pub fn bidirectional<Req, Resp, ReqC, RespC, F, S>(f: F) -> Arc<dyn Handler>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(DecodedStream<Req>) -> S + Clone + Send + Sync + 'static,
    S: Stream<Item = Result<Resp, RpcError>> + Send + 'static,
{
    Arc::new(BidirectionalHandler {
        f,
        _marker: PhantomData::<(Req, Resp, ReqC, RespC)>,
    })
}

struct BidirectionalHandler<Req, Resp, ReqC, RespC, F> {
    f: F,
    _marker: PhantomData<(Req, Resp, ReqC, RespC)>,
}

impl<Req, Resp, ReqC, RespC, F, S> Handler for BidirectionalHandler<Req, Resp, ReqC, RespC, F>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    ReqC: Codec<Req>,
    RespC: Codec<Resp>,
    F: Fn(DecodedStream<Req>) -> S + Clone + Send + Sync + 'static,
    S: Stream<Item = Result<Resp, RpcError>> + Send + 'static,
{
    fn invoke(&self, inbound: MessageStream) -> MessageStream {
        let decoded: DecodedStream<Req> =
            Box::pin(inbound.map(|item| item.and_then(|bytes| Ok(ReqC::decode(&bytes)?))));
        let responses = (self.f.clone())(decoded);
        Box::pin(responses.map(|r| r.and_then(|v| Ok(RespC::encode(&v)?))))
    }
}
