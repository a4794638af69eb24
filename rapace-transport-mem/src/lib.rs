//! An in-process transport that hands frames directly between two peers
//! over a pair of `tokio::mpsc` channels. Not a production transport: it
//! exists so the engine, the stream state machines, and the endpoint facade
//! can be exercised end to end without a real network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rapace_transport::{Transport, TransportError};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct MemTransport {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTransport")
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct Inner {
    tx: tokio::sync::mpsc::Sender<Vec<u8>>,
    rx: tokio::sync::Mutex<tokio::sync::mpsc::Receiver<Vec<u8>>>,
    closed: AtomicBool,
}

impl MemTransport {
    /// Create a connected pair. Frames sent on one end arrive, in order, on
    /// the other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);
        let (tx_b, rx_b) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);

        let a = Self {
            inner: Arc::new(Inner {
                tx: tx_b,
                rx: tokio::sync::Mutex::new(rx_a),
                closed: AtomicBool::new(false),
            }),
        };
        let b = Self {
            inner: Arc::new(Inner {
                tx: tx_a,
                rx: tokio::sync::Mutex::new(rx_b),
                closed: AtomicBool::new(false),
            }),
        };
        (a, b)
    }
}

impl Transport for MemTransport {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inner
            .tx
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv_frame(&self) -> Result<Vec<u8>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut rx = self.inner.rx.lock().await;
        rx.recv().await.ok_or(TransportError::Closed)
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_are_delivered_in_order() {
        let (a, b) = MemTransport::pair();
        a.send_frame(vec![1]).await.unwrap();
        a.send_frame(vec![2]).await.unwrap();
        assert_eq!(b.recv_frame().await.unwrap(), vec![1]);
        assert_eq!(b.recv_frame().await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn closed_transport_rejects_sends_and_receives() {
        let (a, b) = MemTransport::pair();
        a.close();
        assert!(matches!(
            a.send_frame(vec![1]).await,
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            a.recv_frame().await,
            Err(TransportError::Closed)
        ));
        // Closing one side does not affect the other's local state.
        assert!(!b.is_closed());
    }
}
