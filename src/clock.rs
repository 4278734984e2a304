//! Monotonic-ish millisecond clock and ID minting.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;

/// Millisecond timestamps and `pr_`/`tr_` ID minting, plus the socket-id
/// counter used to name newly-accepted connections.
///
/// Timestamps come from wall-clock time (`Utc::now`), which is what the
/// teacher's own server config stack already depends on via `chrono`; the
/// "monotonic-ish" qualifier in the design just means callers must never
/// rely on these to measure elapsed time across a clock step, only to
/// order/record events and compute probe/transfer deadlines.
#[derive(Debug, Default)]
pub struct Clock {
    next_socket_id: AtomicU64,
}

impl Clock {
    #[must_use]
    pub fn new() -> Self {
        Self { next_socket_id: AtomicU64::new(1) }
    }

    #[must_use]
    pub fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn next_socket_id(&self) -> u64 {
        self.next_socket_id.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn next_probe_id(&self) -> String {
        format!("pr_{}_{}", self.now_ms(), random_hex(6))
    }

    #[must_use]
    pub fn next_transfer_id(&self) -> String {
        format!("tr_{}_{}", self.now_ms(), random_hex(6))
    }
}

fn random_hex(chars: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..(chars + 1) / 2).map(|_| rng.gen()).collect();
    let mut s = hex::encode(bytes);
    s.truncate(chars);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_unique_socket_ids() {
        let clock = Clock::new();
        let a = clock.next_socket_id();
        let b = clock.next_socket_id();
        assert_ne!(a, b);
    }

    #[test]
    fn probe_ids_have_expected_shape() {
        let clock = Clock::new();
        let id = clock.next_probe_id();
        assert!(id.starts_with("pr_"));
        assert_eq!(id.rsplit('_').next().unwrap().len(), 6);
    }
}
