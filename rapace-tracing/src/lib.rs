//! Diagnostics as a pure sink.
//!
//! The engine emits [`DiagEvent`]s at lifecycle transitions. A [`Diagnostics`]
//! implementation may log them, count them, forward them to a metrics
//! backend — whatever it likes — but it must never call back into the
//! engine. That asymmetry is what keeps this a one-way edge instead of the
//! logger/diagnostics cycle described in the design notes: the engine always
//! calls `record`, `record` never calls the engine.

use rapace_wire::{StatusCode, StreamId};

/// One observable lifecycle transition of a logical stream or the registry.
#[derive(Debug, Clone)]
pub enum DiagEvent {
    /// A `LogicalStream` was created, either by an outbound call or by an
    /// inbound `BEGIN`.
    StreamOpened {
        stream_id: StreamId,
        service: String,
        method: String,
    },
    /// A `LogicalStream` reached `CLOSED` with the given terminal status.
    StreamClosed {
        stream_id: StreamId,
        status: StatusCode,
    },
    /// An envelope was dropped rather than dispatched (e.g. it arrived for a
    /// stream id already past `STATUS`, or a cancelled stream).
    EnvelopeDropped { stream_id: StreamId, reason: String },
    /// An inbound `BEGIN` named a `(service, method)` with no registered
    /// contract.
    RegistryMiss { service: String, method: String },
    /// A middleware hook returned an error.
    MiddlewareError { stage: &'static str, message: String },
}

/// A sink for [`DiagEvent`]s. The default, [`TracingDiagnostics`], forwards
/// each variant to a `tracing` event at a level appropriate to its severity.
pub trait Diagnostics: Send + Sync + 'static {
    fn record(&self, event: DiagEvent);
}

/// Default [`Diagnostics`] implementation: forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, event: DiagEvent) {
        match event {
            DiagEvent::StreamOpened {
                stream_id,
                service,
                method,
            } => {
                tracing::debug!(stream_id, service = %service, method = %method, "stream opened");
            }
            DiagEvent::StreamClosed { stream_id, status } => {
                tracing::debug!(stream_id, ?status, "stream closed");
            }
            DiagEvent::EnvelopeDropped { stream_id, reason } => {
                tracing::warn!(stream_id, reason = %reason, "envelope dropped");
            }
            DiagEvent::RegistryMiss { service, method } => {
                tracing::warn!(service = %service, method = %method, "method not found");
            }
            DiagEvent::MiddlewareError { stage, message } => {
                tracing::error!(stage, message = %message, "middleware error");
            }
        }
    }
}

/// A [`Diagnostics`] sink that discards every event. Useful in tests that
/// don't want `tracing` output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn record(&self, _event: DiagEvent) {}
}
