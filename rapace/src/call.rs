//! The four call builders (§6.3), one per call pattern. Each is generic over
//! the application request/response types; the wire codec is chosen per call
//! via a turbofish on `.call`, not baked into the builder.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::stream::StreamExt;

use rapace_core::{single_request, Engine};
use rapace_registry::{Codec, ErrorCode, MessageStream, RpcError};
use rapace_transport::Transport;
use rapace_wire::{Metadata, MethodKey, StreamId};

fn stream_of<Req, ReqC: Codec<Req>>(request: Req) -> Result<MessageStream, RpcError> {
    Ok(single_request(ReqC::encode(&request)?))
}

/// The response side of a server-streaming or bidirectional call. Wraps the
/// decoded inbound stream together with the stream id so the caller can
/// cancel mid-stream (§8, "server-stream cancellation") without having to
/// plumb the id through separately.
pub struct CallStream<T: Transport, Resp> {
    engine: Arc<Engine<T>>,
    stream_id: StreamId,
    inner: Pin<Box<dyn Stream<Item = Result<Resp, RpcError>> + Send>>,
}

impl<T: Transport + 'static, Resp> CallStream<T, Resp> {
    fn new<S>(engine: Arc<Engine<T>>, stream_id: StreamId, inner: S) -> Self
    where
        S: Stream<Item = Result<Resp, RpcError>> + Send + 'static,
    {
        Self {
            engine,
            stream_id,
            inner: Box::pin(inner),
        }
    }

    /// Sends `CANCEL` for this stream and stops delivering further messages.
    pub async fn cancel(&self) {
        self.engine.cancel(self.stream_id).await;
    }
}

impl<T: Transport, Resp> Stream for CallStream<T, Resp> {
    type Item = Result<Resp, RpcError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

fn stream_of_many<Req, ReqC, S>(requests: S) -> MessageStream
where
    Req: Send + 'static,
    ReqC: Codec<Req>,
    S: Stream<Item = Req> + Send + 'static,
{
    Box::pin(requests.map(|req| ReqC::encode(&req).map_err(Into::into)))
}

async fn unary_response<Resp, RespC: Codec<Resp>>(mut inbound: MessageStream) -> Result<Resp, RpcError> {
    let item = inbound
        .next()
        .await
        .ok_or_else(|| RpcError::status(ErrorCode::Internal, "stream ended without a response"))??;
    Ok(RespC::decode(&item)?)
}

fn decode_stream<Resp, RespC: Codec<Resp>>(inbound: MessageStream) -> impl Stream<Item = Result<Resp, RpcError>>
where
    Resp: Send + 'static,
{
    inbound.map(|item| item.and_then(|bytes| Ok(RespC::decode(&bytes)?)))
}

/// Builds a unary call: one request, one response.
pub struct UnaryCallBuilder<T: Transport, Req, Resp> {
    engine: Arc<Engine<T>>,
    method: Result<MethodKey, RpcError>,
    _marker: PhantomData<(Req, Resp)>,
}

impl<T: Transport + 'static, Req, Resp> UnaryCallBuilder<T, Req, Resp> {
    pub(crate) fn new(engine: Arc<Engine<T>>, method: Result<MethodKey, RpcError>) -> Self {
        Self {
            engine,
            method,
            _marker: PhantomData,
        }
    }

    pub async fn call<ReqC: Codec<Req>, RespC: Codec<Resp>>(&self, request: Req) -> Result<Resp, RpcError> {
        self.call_with_metadata::<ReqC, RespC>(request, Vec::new()).await
    }

    pub async fn call_with_metadata<ReqC: Codec<Req>, RespC: Codec<Resp>>(
        &self,
        request: Req,
        metadata: Metadata,
    ) -> Result<Resp, RpcError> {
        let method = self.method.clone()?;
        let outbound = stream_of::<Req, ReqC>(request)?;
        let (_stream_id, inbound) = self.engine.open_stream(method, metadata, outbound).await?;
        unary_response::<Resp, RespC>(inbound).await
    }
}

/// Builds a server-streaming call: one request, a sequence of responses.
pub struct ServerStreamCallBuilder<T: Transport, Req, Resp> {
    engine: Arc<Engine<T>>,
    method: Result<MethodKey, RpcError>,
    _marker: PhantomData<(Req, Resp)>,
}

impl<T: Transport + 'static, Req, Resp: Send + 'static> ServerStreamCallBuilder<T, Req, Resp> {
    pub(crate) fn new(engine: Arc<Engine<T>>, method: Result<MethodKey, RpcError>) -> Self {
        Self {
            engine,
            method,
            _marker: PhantomData,
        }
    }

    pub async fn call<ReqC: Codec<Req>, RespC: Codec<Resp>>(
        &self,
        request: Req,
    ) -> Result<CallStream<T, Resp>, RpcError> {
        let method = self.method.clone()?;
        let outbound = stream_of::<Req, ReqC>(request)?;
        let (stream_id, inbound) = self.engine.open_stream(method, Vec::new(), outbound).await?;
        Ok(CallStream::new(
            Arc::clone(&self.engine),
            stream_id,
            decode_stream::<Resp, RespC>(inbound),
        ))
    }
}

/// Builds a client-streaming call: a sequence of requests, one response.
pub struct ClientStreamCallBuilder<T: Transport, Req, Resp> {
    engine: Arc<Engine<T>>,
    method: Result<MethodKey, RpcError>,
    _marker: PhantomData<(Req, Resp)>,
}

impl<T: Transport + 'static, Req: Send + 'static, Resp> ClientStreamCallBuilder<T, Req, Resp> {
    pub(crate) fn new(engine: Arc<Engine<T>>, method: Result<MethodKey, RpcError>) -> Self {
        Self {
            engine,
            method,
            _marker: PhantomData,
        }
    }

    pub async fn call<ReqC, RespC, S>(&self, requests: S) -> Result<Resp, RpcError>
    where
        ReqC: Codec<Req>,
        RespC: Codec<Resp>,
        S: Stream<Item = Req> + Send + 'static,
    {
        let method = self.method.clone()?;
        let outbound = stream_of_many::<Req, ReqC, S>(requests);
        let (_stream_id, inbound) = self.engine.open_stream(method, Vec::new(), outbound).await?;
        unary_response::<Resp, RespC>(inbound).await
    }
}

/// Builds a bidirectional-streaming call: independent sequences of requests
/// and responses.
pub struct BidirectionalCallBuilder<T: Transport, Req, Resp> {
    engine: Arc<Engine<T>>,
    method: Result<MethodKey, RpcError>,
    _marker: PhantomData<(Req, Resp)>,
}

impl<T: Transport + 'static, Req: Send + 'static, Resp: Send + 'static> BidirectionalCallBuilder<T, Req, Resp> {
    pub(crate) fn new(engine: Arc<Engine<T>>, method: Result<MethodKey, RpcError>) -> Self {
        Self {
            engine,
            method,
            _marker: PhantomData,
        }
    }

    pub async fn call<ReqC, RespC, S>(&self, requests: S) -> Result<CallStream<T, Resp>, RpcError>
    where
        ReqC: Codec<Req>,
        RespC: Codec<Resp>,
        S: Stream<Item = Req> + Send + 'static,
    {
        let method = self.method.clone()?;
        let outbound = stream_of_many::<Req, ReqC, S>(requests);
        let (stream_id, inbound) = self.engine.open_stream(method, Vec::new(), outbound).await?;
        Ok(CallStream::new(
            Arc::clone(&self.engine),
            stream_id,
            decode_stream::<Resp, RespC>(inbound),
        ))
    }
}
