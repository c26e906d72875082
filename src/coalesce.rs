//! Keep-latest request coalescing.
//!
//! Live radius dragging produces bursts of requests, each costing two
//! full-resolution passes plus a GPU→host readback. A bounded(1) channel
//! where the producer drops the stale pending value collapses a burst so
//! only the most recent radius is ever rendered.

use crossbeam_channel::{Receiver, Sender, bounded};

/// A single-slot queue: `submit` replaces any pending value, `take` drains
/// the slot. Senders never block.
pub struct LatestOnly<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> LatestOnly<T> {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        LatestOnly { tx, rx }
    }

    /// Queue `value`, superseding a pending one the consumer has not taken.
    pub fn submit(&self, value: T) {
        // Keep only latest: bounded(1) + drop the stale value if the
        // consumer hasn't caught up.
        if let Err(err) = self.tx.try_send(value) {
            let value = err.into_inner();
            while self.rx.try_recv().is_ok() {}
            let _ = self.tx.try_send(value);
        }
    }

    /// Take the most recent pending value, if any.
    pub fn take(&self) -> Option<T> {
        let mut latest = None;
        while let Ok(value) = self.rx.try_recv() {
            latest = Some(value);
        }
        latest
    }
}

impl<T> Default for LatestOnly<T> {
    fn default() -> Self {
        Self::new()
    }
}
