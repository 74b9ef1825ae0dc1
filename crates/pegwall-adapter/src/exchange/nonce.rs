/*
[INPUT]:  Wall-clock milliseconds and venue rejection text
[OUTPUT]: Monotonic request nonces plus a resynchronization counter
[POS]:    Exchange layer - nonce bookkeeping shared by venue adapters
[UPDATE]: When venues announce expected nonces in a new format
*/

use std::cmp::max;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Nonce source for signed venue requests.
///
/// `next` hands out strictly increasing nonces that never fall behind the
/// clock. `adjust` is the resynchronization primitive: it bumps the shift
/// counter and, when the venue names the nonce it expected, jumps past it.
#[derive(Debug, Default)]
pub struct NonceTracker {
    last: AtomicU64,
    shift: AtomicI64,
}

impl NonceTracker {
    pub fn new(initial: Option<u64>) -> Self {
        Self {
            last: AtomicU64::new(initial.unwrap_or(0)),
            shift: AtomicI64::new(0),
        }
    }

    pub fn next(&self, now_ms: u64) -> u64 {
        let shifted = now_ms.saturating_add_signed(self.shift.load(Ordering::Relaxed));
        loop {
            let cur = self.last.load(Ordering::Relaxed);
            let candidate = max(shifted, cur.saturating_add(1));
            if self
                .last
                .compare_exchange(cur, candidate, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return candidate;
            }
        }
    }

    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }

    /// Number of resynchronizations performed so far.
    pub fn shift(&self) -> i64 {
        self.shift.load(Ordering::Relaxed)
    }

    /// Resynchronize after a rejected call; returns the new shift.
    pub fn adjust(&self, message: &str) -> i64 {
        if let Some(expected) = announced_nonce(message) {
            self.last.fetch_max(expected, Ordering::SeqCst);
        }
        self.shift.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Largest integer in a message that mentions a nonce.
fn announced_nonce(message: &str) -> Option<u64> {
    if !message.to_ascii_lowercase().contains("nonce") {
        return None;
    }

    message
        .split(|c: char| !c.is_ascii_digit())
        .filter(|chunk| !chunk.is_empty())
        .filter_map(|chunk| chunk.parse::<u64>().ok())
        .max()
}
