//! The engine: owns a transport, demultiplexes inbound envelopes onto
//! per-stream queues, and drives both inbound (server) dispatch and outbound
//! (client) call construction over it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

use rapace_registry::{
    ErrorCode, Handler, HandlerItem, MessageStream, MethodContract, MethodKind, Registry, RpcError,
};
use rapace_tracing::{DiagEvent, Diagnostics, TracingDiagnostics};
use rapace_transport::{Transport, TransportError};
use rapace_wire::{decode, encode, Envelope, MethodKey, Metadata, Status, StatusCode, StreamId};

use crate::middleware::MiddlewareChain;
use crate::{EndpointConfig, Side};

/// Per-stream bookkeeping the engine keeps while a `LogicalStream` is alive.
struct StreamEntry {
    /// The consumer's half of this stream's inbound queue. Dropped (set to
    /// `None`) on `HALF_CLOSE` or terminal `STATUS` so the consumer's stream
    /// ends.
    inbound_tx: Option<mpsc::UnboundedSender<HandlerItem>>,
    /// Fires once if a `CANCEL` arrives while a server-side handler
    /// invocation is in flight for this stream.
    cancel_tx: Option<oneshot::Sender<()>>,
    /// Set once a `HALF_CLOSE` has been seen for this stream. Any further
    /// `MESSAGE` is a protocol violation (§4.4).
    half_closed: bool,
    /// `Some(kind)` for server-side entries (`handle_begin`), used to
    /// enforce per-kind request cardinality; `None` for client-side
    /// entries, which track responses rather than requests.
    request_kind: Option<MethodKind>,
    /// Count of inbound `MESSAGE`s accepted so far, checked against
    /// `request_kind`'s cardinality.
    message_count: u32,
}

/// Owns a transport, the method registry, and every live `LogicalStream`.
pub struct Engine<T: Transport> {
    transport: T,
    registry: Arc<Registry>,
    diagnostics: Arc<dyn Diagnostics>,
    middleware: Mutex<MiddlewareChain>,
    ids: crate::StreamIdAllocator,
    streams: Mutex<HashMap<StreamId, StreamEntry>>,
    config: EndpointConfig,
    write_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T, registry: Arc<Registry>, side: Side, config: EndpointConfig) -> Arc<Self> {
        Self::with_diagnostics(transport, registry, side, config, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(
        transport: T,
        registry: Arc<Registry>,
        side: Side,
        config: EndpointConfig,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            registry,
            diagnostics,
            middleware: Mutex::new(MiddlewareChain::default()),
            ids: crate::StreamIdAllocator::new(side),
            streams: Mutex::new(HashMap::new()),
            config,
            write_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn add_middleware(&self, middleware: Arc<dyn crate::Middleware>) {
        self.middleware.lock().push(middleware);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Spawns the read loop that demultiplexes inbound frames. Runs until
    /// the transport closes or fails.
    pub fn spawn_read_loop(self: &Arc<Self>)
    where
        T: 'static,
    {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.read_loop().await;
        });
    }

    async fn read_loop(self: Arc<Self>) {
        loop {
            let frame = match self.transport.recv_frame().await {
                Ok(frame) => frame,
                Err(_) => {
                    self.fail_all_streams(StatusCode::Unavailable, "transport closed");
                    return;
                }
            };
            let envelope = match decode(&frame) {
                Ok(envelope) => envelope,
                Err(e) => {
                    self.diagnostics.record(DiagEvent::EnvelopeDropped {
                        stream_id: 0,
                        reason: format!("malformed frame: {e}"),
                    });
                    continue;
                }
            };
            self.clone().handle_inbound(envelope).await;
        }
    }

    async fn handle_inbound(self: Arc<Self>, envelope: Envelope) {
        match envelope {
            Envelope::Begin {
                stream_id,
                method,
                metadata: _,
            } => self.handle_begin(stream_id, method).await,
            Envelope::Message { stream_id, payload } => {
                let action = {
                    let mut streams = self.streams.lock();
                    match streams.get_mut(&stream_id) {
                        None => MessageAction::Drop,
                        Some(entry) if entry.half_closed => {
                            MessageAction::Violation(Status::new(
                                StatusCode::Internal,
                                "message received after half-close",
                            ))
                        }
                        Some(entry)
                            if entry.request_kind == Some(MethodKind::Unary) && entry.message_count >= 1 =>
                        {
                            MessageAction::Violation(Status::new(
                                StatusCode::InvalidArgument,
                                "unary method received more than one request message",
                            ))
                        }
                        Some(entry) => {
                            entry.message_count += 1;
                            let sent = entry
                                .inbound_tx
                                .as_ref()
                                .map(|tx| tx.send(Ok(payload)).is_ok())
                                .unwrap_or(false);
                            if sent {
                                MessageAction::Delivered
                            } else {
                                MessageAction::Drop
                            }
                        }
                    }
                };
                match action {
                    MessageAction::Delivered => {}
                    MessageAction::Drop => {
                        self.diagnostics.record(DiagEvent::EnvelopeDropped {
                            stream_id,
                            reason: "message for unknown or half-closed stream".into(),
                        });
                    }
                    MessageAction::Violation(status) => {
                        self.abort_stream(stream_id);
                        self.send_status(stream_id, status).await;
                    }
                }
            }
            Envelope::HalfClose { stream_id } => {
                let mut streams = self.streams.lock();
                if let Some(entry) = streams.get_mut(&stream_id) {
                    entry.inbound_tx = None;
                    entry.half_closed = true;
                }
            }
            Envelope::Cancel { stream_id } => {
                let cancel_tx = {
                    let mut streams = self.streams.lock();
                    streams.get_mut(&stream_id).and_then(|e| e.cancel_tx.take())
                };
                if let Some(cancel_tx) = cancel_tx {
                    let _ = cancel_tx.send(());
                }
                self.resolve_stream(stream_id, Err(RpcError::status(ErrorCode::Cancelled, "cancelled by peer")));
            }
            Envelope::Status { stream_id, status, .. } => {
                self.diagnostics.record(DiagEvent::StreamClosed {
                    stream_id,
                    status: status.code,
                });
                if status.is_ok() {
                    self.resolve_stream(stream_id, Ok(()));
                } else {
                    let err = RpcError::Status {
                        code: status.code,
                        message: status.message,
                        details: status.details,
                    };
                    self.resolve_stream(stream_id, Err(err));
                }
            }
        }
    }

    /// Ends a stream's inbound queue, optionally pushing a final error item
    /// first, and removes its bookkeeping entry.
    fn resolve_stream(&self, stream_id: StreamId, outcome: Result<(), RpcError>) {
        let mut streams = self.streams.lock();
        if let Some(mut entry) = streams.remove(&stream_id) {
            if let (Err(e), Some(tx)) = (outcome, entry.inbound_tx.take()) {
                let _ = tx.send(Err(e));
            }
        }
    }

    /// Removes a stream's bookkeeping and wakes its handler (if any) via
    /// `cancel_tx`, without sending anything to the peer — the caller sends
    /// the terminal `STATUS` itself.
    fn abort_stream(&self, stream_id: StreamId) {
        let mut streams = self.streams.lock();
        if let Some(mut entry) = streams.remove(&stream_id) {
            if let Some(cancel_tx) = entry.cancel_tx.take() {
                let _ = cancel_tx.send(());
            }
        }
    }

    fn fail_all_streams(&self, code: StatusCode, message: &str) {
        self.closed.store(true, Ordering::Release);
        let mut streams = self.streams.lock();
        for (_, mut entry) in streams.drain() {
            if let Some(tx) = entry.inbound_tx.take() {
                let _ = tx.send(Err(RpcError::status(code, message)));
            }
            if let Some(cancel_tx) = entry.cancel_tx.take() {
                let _ = cancel_tx.send(());
            }
        }
    }

    async fn handle_begin(self: Arc<Self>, stream_id: StreamId, method: MethodKey) {
        let contract = self.registry.lookup(&method.service_name, &method.method_name);
        let Some(contract) = contract else {
            self.diagnostics.record(DiagEvent::RegistryMiss {
                service: method.service_name.clone(),
                method: method.method_name.clone(),
            });
            self.send_status(stream_id, Status::new(StatusCode::Unimplemented, "method not found"))
                .await;
            return;
        };

        self.diagnostics.record(DiagEvent::StreamOpened {
            stream_id,
            service: contract.service_name.clone(),
            method: contract.method_name.clone(),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.streams.lock().insert(
            stream_id,
            StreamEntry {
                inbound_tx: Some(tx),
                cancel_tx: Some(cancel_tx),
                half_closed: false,
                request_kind: Some(contract.kind),
                message_count: 0,
            },
        );

        let engine = Arc::clone(&self);
        tokio::spawn(async move {
            engine.drive_handler(stream_id, contract, rx, cancel_rx).await;
        });
    }

    async fn drive_handler(
        self: Arc<Self>,
        stream_id: StreamId,
        contract: Arc<MethodContract>,
        rx: mpsc::UnboundedReceiver<HandlerItem>,
        mut cancel_rx: oneshot::Receiver<()>,
    ) {
        let service = contract.service_name.clone();
        let method = contract.method_name.clone();
        let inbound = self.apply_request_middleware(rx, service.clone(), method.clone());
        let mut outbound = contract.handler.invoke(inbound);

        let timeout_ms = contract.metadata.timeout_ms.or(self.config.default_timeout_ms);
        let deadline = timeout_ms.map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms));

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut cancel_rx => {
                    self.streams.lock().remove(&stream_id);
                    return;
                }
                next = next_with_deadline(&mut outbound, deadline) => next,
            };

            match next {
                Some(Timed::Ready(Ok(bytes))) => {
                    let bytes = match self.middleware.lock().process_response(&service, &method, bytes) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            self.diagnostics.record(DiagEvent::MiddlewareError {
                                stage: "process_response",
                                message: e.to_string(),
                            });
                            self.send_status(stream_id, Status::new(e.code(), e.to_string()))
                                .await;
                            self.streams.lock().remove(&stream_id);
                            return;
                        }
                    };
                    self.send_message(stream_id, bytes).await;
                }
                Some(Timed::Ready(Err(e))) => {
                    self.send_status(stream_id, Status::new(e.code(), e.to_string())).await;
                    self.streams.lock().remove(&stream_id);
                    return;
                }
                Some(Timed::Elapsed) => {
                    self.send_status(stream_id, Status::new(StatusCode::DeadlineExceeded, "deadline exceeded"))
                        .await;
                    self.streams.lock().remove(&stream_id);
                    return;
                }
                None => {
                    self.send_status(stream_id, Status::ok()).await;
                    self.streams.lock().remove(&stream_id);
                    return;
                }
            }
        }
    }

    fn apply_request_middleware(
        &self,
        rx: mpsc::UnboundedReceiver<HandlerItem>,
        service: String,
        method: String,
    ) -> MessageStream {
        // Cloned (cheap: `Arc<dyn Middleware>` entries) so the chain can be
        // read per item without holding `parking_lot::MutexGuard`, which is
        // not `Send`, across the stream's lifetime.
        let chain = self.middleware.lock().clone();
        Box::pin(UnboundedReceiverStream::new(rx).map(move |item| {
            item.and_then(|bytes| chain.process_request(&service, &method, bytes))
        }))
    }

    /// Applies the response side of the middleware chain to a client call's
    /// inbound stream, mirroring `apply_request_middleware` for the
    /// opposite direction and the opposite role (§4.7): a handler's
    /// response runs `process_response` server-side on the way out
    /// (`drive_handler`), and a caller's response runs it again here on the
    /// way in, so client-registered middleware can inspect or rewrite
    /// responses too.
    fn apply_response_middleware(
        &self,
        rx: mpsc::UnboundedReceiver<HandlerItem>,
        service: String,
        method: String,
    ) -> MessageStream {
        let chain = self.middleware.lock().clone();
        Box::pin(UnboundedReceiverStream::new(rx).map(move |item| {
            item.and_then(|bytes| chain.process_response(&service, &method, bytes))
        }))
    }

    async fn send_message(&self, stream_id: StreamId, payload: Vec<u8>) {
        let _ = self.send_envelope(&Envelope::Message { stream_id, payload }).await;
    }

    async fn send_status(&self, stream_id: StreamId, status: Status) {
        let _ = self
            .send_envelope(&Envelope::Status {
                stream_id,
                metadata: Vec::new(),
                status,
            })
            .await;
    }

    async fn send_envelope(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let _guard = self.write_lock.lock().await;
        self.transport.send_frame(encode(envelope)).await
    }

    /// Opens an outbound logical stream: allocates a stream id, sends
    /// `BEGIN`, forwards `outbound` as `MESSAGE`s followed by `HALF_CLOSE`,
    /// and returns the inbound response stream.
    pub async fn open_stream(
        self: &Arc<Self>,
        method: MethodKey,
        metadata: Metadata,
        outbound: MessageStream,
    ) -> Result<(StreamId, MessageStream), RpcError>
    where
        T: 'static,
    {
        if self.is_closed() {
            return Err(RpcError::status(ErrorCode::Unavailable, "endpoint is closed"));
        }

        let stream_id = self.ids.next();
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().insert(
            stream_id,
            StreamEntry {
                inbound_tx: Some(tx),
                cancel_tx: None,
                half_closed: false,
                request_kind: None,
                message_count: 0,
            },
        );

        self.diagnostics.record(DiagEvent::StreamOpened {
            stream_id,
            service: method.service_name.clone(),
            method: method.method_name.clone(),
        });

        self.send_envelope(&Envelope::Begin {
            stream_id,
            method: method.clone(),
            metadata,
        })
        .await
        .map_err(|e| RpcError::Transport(e.to_string()))?;

        let engine = Arc::clone(self);
        let service = method.service_name.clone();
        let method_name = method.method_name.clone();
        tokio::spawn(async move {
            engine.write_outbound(stream_id, service, method_name, outbound).await;
        });

        let inbound = self.apply_response_middleware(rx, method.service_name, method.method_name);
        Ok((stream_id, inbound))
    }

    async fn write_outbound(
        self: Arc<Self>,
        stream_id: StreamId,
        service: String,
        method: String,
        mut outbound: MessageStream,
    ) {
        while let Some(item) = outbound.next().await {
            match item {
                Ok(bytes) => {
                    let bytes = match self.middleware.lock().process_request(&service, &method, bytes) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            self.diagnostics.record(DiagEvent::MiddlewareError {
                                stage: "process_request",
                                message: e.to_string(),
                            });
                            self.cancel_locally(stream_id, e).await;
                            return;
                        }
                    };
                    self.send_message(stream_id, bytes).await;
                }
                Err(e) => {
                    self.cancel_locally(stream_id, e).await;
                    return;
                }
            }
        }
        let _ = self.send_envelope(&Envelope::HalfClose { stream_id }).await;
    }

    /// Cancels an open stream: tells the peer, and immediately resolves the
    /// local consumer with the given error rather than waiting for any
    /// acknowledgement.
    pub async fn cancel_locally(&self, stream_id: StreamId, err: RpcError) {
        self.resolve_stream(stream_id, Err(err));
        let _ = self.send_envelope(&Envelope::Cancel { stream_id }).await;
    }

    /// User-facing cancellation: sends `CANCEL` and resolves the local
    /// stream with `STATUS(CANCELLED)` immediately (§5).
    pub async fn cancel(&self, stream_id: StreamId) {
        self.cancel_locally(stream_id, RpcError::status(ErrorCode::Cancelled, "cancelled locally"))
            .await;
    }

    /// Equivalent to cancelling every open stream, then closing the
    /// transport (§4.6).
    pub async fn close(&self) {
        self.fail_all_streams(StatusCode::Cancelled, "endpoint closed");
        self.transport.close();
    }
}

enum MessageAction {
    Delivered,
    Drop,
    Violation(Status),
}

enum Timed<O> {
    Ready(O),
    Elapsed,
}

async fn next_with_deadline<S>(stream: &mut S, deadline: Option<tokio::time::Instant>) -> Option<Timed<S::Item>>
where
    S: Stream + Unpin,
{
    match deadline {
        None => stream.next().await.map(Timed::Ready),
        Some(deadline) => match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(item) => item.map(Timed::Ready),
            Err(_) => Some(Timed::Elapsed),
        },
    }
}

/// Wraps a single already-encoded request into the one-shot outbound
/// [`MessageStream`] the unary and server-streaming call builders send.
pub fn single_request(payload: Vec<u8>) -> MessageStream {
    Box::pin(stream::once(async move { Ok(payload) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapace_registry::{JsonCodec, MethodMetadata, ServiceContract};
    use rapace_transport_mem::MemTransport;

    fn echo_service() -> ServiceContract {
        ServiceContract::define("Echo", |svc| {
            svc.unary::<String, String, JsonCodec, JsonCodec, _, _>(
                "Say",
                MethodMetadata::default(),
                |req| async move { Ok(req) },
            );
        })
    }

    #[tokio::test]
    async fn unary_round_trip_over_mem_transport() {
        let (client_t, server_t) = MemTransport::pair();
        let registry = Arc::new(Registry::new());
        registry.register_service(echo_service()).unwrap();

        let server = Engine::new(server_t, registry, Side::Server, EndpointConfig::default());
        server.spawn_read_loop();

        let client = Engine::new(
            client_t,
            Arc::new(Registry::new()),
            Side::Client,
            EndpointConfig::default(),
        );
        client.spawn_read_loop();

        let request = <JsonCodec as rapace_registry::Codec<String>>::encode(&"hi".to_string()).unwrap();
        let (_stream_id, mut inbound) = client
            .open_stream(MethodKey::new("Echo", "Say"), Vec::new(), single_request(request))
            .await
            .unwrap();

        let response = inbound.next().await.unwrap().unwrap();
        let response: String = <JsonCodec as rapace_registry::Codec<String>>::decode(&response).unwrap();
        assert_eq!(response, "hi");
        assert!(inbound.next().await.is_none());
    }

    #[tokio::test]
    async fn unimplemented_method_yields_status_without_invoking_handler() {
        let (client_t, server_t) = MemTransport::pair();
        let server = Engine::new(server_t, Arc::new(Registry::new()), Side::Server, EndpointConfig::default());
        server.spawn_read_loop();

        let client = Engine::new(
            client_t,
            Arc::new(Registry::new()),
            Side::Client,
            EndpointConfig::default(),
        );
        client.spawn_read_loop();

        let (_stream_id, mut inbound) = client
            .open_stream(
                MethodKey::new("Unknown", "Method"),
                Vec::new(),
                single_request(vec![]),
            )
            .await
            .unwrap();

        let err = inbound.next().await.unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unimplemented);
    }

    fn blocking_echo_service(gate: Arc<tokio::sync::Notify>) -> ServiceContract {
        ServiceContract::define("Echo", |svc| {
            svc.unary::<String, String, JsonCodec, JsonCodec, _, _>(
                "Say",
                MethodMetadata::default(),
                move |req| {
                    let gate = Arc::clone(&gate);
                    async move {
                        gate.notified().await;
                        Ok(req)
                    }
                },
            );
        })
    }

    #[tokio::test]
    async fn unary_method_rejects_a_second_request_message() {
        let (client_t, server_t) = MemTransport::pair();
        let gate = Arc::new(tokio::sync::Notify::new());
        let registry = Arc::new(Registry::new());
        registry.register_service(blocking_echo_service(gate)).unwrap();
        let server = Engine::new(server_t, registry, Side::Server, EndpointConfig::default());
        server.spawn_read_loop();

        let stream_id: StreamId = 2;
        let first = <JsonCodec as rapace_registry::Codec<String>>::encode(&"hi".to_string()).unwrap();
        let second = <JsonCodec as rapace_registry::Codec<String>>::encode(&"there".to_string()).unwrap();

        client_t
            .send_frame(encode(&Envelope::Begin {
                stream_id,
                method: MethodKey::new("Echo", "Say"),
                metadata: Vec::new(),
            }))
            .await
            .unwrap();
        client_t
            .send_frame(encode(&Envelope::Message { stream_id, payload: first }))
            .await
            .unwrap();
        client_t
            .send_frame(encode(&Envelope::Message { stream_id, payload: second }))
            .await
            .unwrap();

        let frame = client_t.recv_frame().await.unwrap();
        match decode(&frame).unwrap() {
            Envelope::Status { status, .. } => assert_eq!(status.code, StatusCode::InvalidArgument),
            other => panic!("expected a status envelope, got {other:?}"),
        }
    }

    fn hanging_stream_service() -> ServiceContract {
        ServiceContract::define("Progress", |svc| {
            svc.server_streaming::<u32, u32, JsonCodec, JsonCodec, _, _>(
                "Hang",
                MethodMetadata::default(),
                |_n| stream::pending::<Result<u32, RpcError>>(),
            );
        })
    }

    #[tokio::test]
    async fn message_after_half_close_is_rejected() {
        let (client_t, server_t) = MemTransport::pair();
        let registry = Arc::new(Registry::new());
        registry.register_service(hanging_stream_service()).unwrap();
        let server = Engine::new(server_t, registry, Side::Server, EndpointConfig::default());
        server.spawn_read_loop();

        let stream_id: StreamId = 2;
        let request = <JsonCodec as rapace_registry::Codec<u32>>::encode(&1u32).unwrap();

        client_t
            .send_frame(encode(&Envelope::Begin {
                stream_id,
                method: MethodKey::new("Progress", "Hang"),
                metadata: Vec::new(),
            }))
            .await
            .unwrap();
        client_t
            .send_frame(encode(&Envelope::Message { stream_id, payload: request.clone() }))
            .await
            .unwrap();
        client_t
            .send_frame(encode(&Envelope::HalfClose { stream_id }))
            .await
            .unwrap();
        client_t
            .send_frame(encode(&Envelope::Message { stream_id, payload: request }))
            .await
            .unwrap();

        let frame = client_t.recv_frame().await.unwrap();
        match decode(&frame).unwrap() {
            Envelope::Status { status, .. } => assert_eq!(status.code, StatusCode::Internal),
            other => panic!("expected a status envelope, got {other:?}"),
        }
    }

    fn counting_service() -> ServiceContract {
        ServiceContract::define("Progress", |svc| {
            svc.server_streaming::<u32, u32, JsonCodec, JsonCodec, _, _>(
                "CountTo",
                MethodMetadata::default(),
                |n| {
                    stream::unfold(0u32, move |i| async move {
                        if i < n {
                            tokio::task::yield_now().await;
                            Some((Ok(i), i + 1))
                        } else {
                            None
                        }
                    })
                },
            );
        })
    }

    #[tokio::test]
    async fn cancelling_a_server_stream_stops_further_messages() {
        let (client_t, server_t) = MemTransport::pair();
        let registry = Arc::new(Registry::new());
        registry.register_service(counting_service()).unwrap();
        let server = Engine::new(server_t, registry, Side::Server, EndpointConfig::default());
        server.spawn_read_loop();

        let client = Engine::new(
            client_t,
            Arc::new(Registry::new()),
            Side::Client,
            EndpointConfig::default(),
        );
        client.spawn_read_loop();

        let request = <JsonCodec as rapace_registry::Codec<u32>>::encode(&100u32).unwrap();
        let (stream_id, mut inbound) = client
            .open_stream(MethodKey::new("Progress", "CountTo"), Vec::new(), single_request(request))
            .await
            .unwrap();

        let first = inbound.next().await.unwrap().unwrap();
        assert_eq!(first, 0);

        client.cancel(stream_id).await;
        let next = inbound.next().await;
        match next {
            None => {}
            Some(Err(e)) => assert_eq!(e.code(), ErrorCode::Cancelled),
            Some(Ok(_)) => panic!("expected no further messages after cancel"),
        }
    }
}
