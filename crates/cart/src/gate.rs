//! Ordering and liveness guard for state-refreshing calls.
//!
//! Every call that may overwrite the mirrored state takes a ticket when it
//! starts. A result is written only if its ticket is newer than the last
//! written one and the owner has not detached.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Monotonic ticket issued at the start of a refreshing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    /// The raw sequence number.
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

/// Issues tickets and tracks the owner's liveness.
#[derive(Debug)]
pub struct RefreshGate {
    next: AtomicU64,
    active: AtomicBool,
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshGate {
    /// A live gate with no tickets issued.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            active: AtomicBool::new(true),
        }
    }

    /// Issue the next ticket.
    pub fn begin(&self) -> Ticket {
        Ticket(self.next.fetch_add(1, Ordering::SeqCst))
    }

    /// Whether the owner is still alive.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark the owner as gone. Pending results will be dropped.
    pub fn detach(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Last ticket whose result was written.
#[derive(Debug, Default, Clone, Copy)]
pub struct Watermark(u64);

impl Watermark {
    /// Accept `ticket` if it is newer than anything written so far.
    pub const fn admit(&mut self, ticket: Ticket) -> bool {
        if ticket.0 > self.0 {
            self.0 = ticket.0;
            true
        } else {
            false
        }
    }

    /// Whether nothing at or after `ticket` has been written yet.
    #[must_use]
    pub const fn is_behind(&self, ticket: Ticket) -> bool {
        ticket.0 > self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_increase() {
        let gate = RefreshGate::new();
        let a = gate.begin();
        let b = gate.begin();
        assert!(b > a);
        assert_eq!(b.seq(), a.seq() + 1);
    }

    #[test]
    fn test_watermark_rejects_older_tickets() {
        let gate = RefreshGate::new();
        let slow_fetch = gate.begin();
        let fast_update = gate.begin();

        let mut mark = Watermark::default();
        assert!(mark.admit(fast_update));
        assert!(!mark.admit(slow_fetch));
        assert!(!mark.admit(fast_update));
        assert!(!mark.is_behind(slow_fetch));
        assert!(mark.is_behind(gate.begin()));
    }

    #[test]
    fn test_detach() {
        let gate = RefreshGate::new();
        assert!(gate.is_active());
        gate.detach();
        assert!(!gate.is_active());
    }
}
