use std::sync::atomic::{AtomicU64, Ordering};

use rapace_wire::StreamId;

use crate::Side;

/// Monotonic, parity-segregated stream id source (§5).
pub struct StreamIdAllocator {
    next: AtomicU64,
}

impl StreamIdAllocator {
    pub fn new(side: Side) -> Self {
        let start = match side {
            Side::Client => 0,
            Side::Server => 1,
        };
        Self {
            next: AtomicU64::new(start),
        }
    }

    pub fn next(&self) -> StreamId {
        self.next.fetch_add(2, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_are_even_server_ids_are_odd() {
        let client = StreamIdAllocator::new(Side::Client);
        assert_eq!(client.next(), 0);
        assert_eq!(client.next(), 2);
        assert_eq!(client.next(), 4);

        let server = StreamIdAllocator::new(Side::Server);
        assert_eq!(server.next(), 1);
        assert_eq!(server.next(), 3);
    }
}
