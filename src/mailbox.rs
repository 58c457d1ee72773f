use log::trace;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Single-slot hand-off between a frame producer and the acquisition loop.
///
/// Posting replaces a frame nobody picked up yet, so the consumer always gets
/// the newest one and stale frames never queue up.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
    dropped: AtomicU64,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn post(&self, item: T) {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if slot.replace(item).is_some() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            trace!("Mailbox overwrote unconsumed item ({} dropped)", dropped);
        }

        self.ready.notify_one();
    }

    /// Blocks until an item is available or `timeout` elapses.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        loop {
            if let Some(item) = slot.take() {
                return Some(item);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            slot = match self.ready.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn try_take(&self) -> Option<T> {
        match self.slot.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// Number of items overwritten before anyone took them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
