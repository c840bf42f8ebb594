//! Single-flight guard
//!
//! One reconciliation per reconciler instance at a time. A caller that finds
//! the guard taken is turned away instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    blocked: AtomicBool,
}

impl ConcurrencyGuard {
    /// Take the guard, or `None` if another pass holds it
    pub fn try_acquire(&self) -> Option<FlightPermit<'_>> {
        self.blocked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit { guard: self })
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped, whichever way the pass ends
#[derive(Debug)]
pub struct FlightPermit<'a> {
    guard: &'a ConcurrencyGuard,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.guard.blocked.store(false, Ordering::Release);
    }
}
