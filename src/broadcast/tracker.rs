//! Completion Tracker
//!
//! A countdown shared by every peer call of one broadcast. Each call reports
//! its terminal state exactly once; the call that brings the count to zero
//! runs the completion callback, which closes the aggregate stream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type DoneFn = Box<dyn FnOnce() + Send>;

pub struct CompletionTracker {
    remaining: AtomicUsize,
    total: usize,
    on_done: Mutex<Option<DoneFn>>,
}

impl CompletionTracker {
    /// Creates a tracker expecting `total` completions.
    ///
    /// With `total == 0` the callback runs before this returns.
    pub fn new<F>(total: usize, on_done: F) -> Arc<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let tracker = Arc::new(Self {
            remaining: AtomicUsize::new(total),
            total,
            on_done: Mutex::new(Some(Box::new(on_done))),
        });

        if total == 0 {
            tracker.fire();
        }

        tracker
    }

    /// Records one terminal peer call.
    pub fn mark_one_done(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.fire(),
            Ok(_) => {}
            Err(_) => {
                tracing::error!(
                    "Completion tracker decremented past zero (total={})",
                    self.total
                );
            }
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn fire(&self) {
        let callback = match self.on_done.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(callback) = callback {
            callback();
        }
    }
}
