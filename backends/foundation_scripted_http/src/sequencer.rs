//! Request-to-instruction index assignment.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out instruction indices in arrival order.
///
/// Every call to [`Sequencer::next_index`] returns a distinct value and the
/// values issued are exactly `0..calls`. The cursor is only touched for the
/// increment itself, so a caller that goes on to sleep or block on I/O never
/// holds up other callers.
#[derive(Debug, Default)]
pub struct Sequencer {
    cursor: AtomicUsize,
}

impl Sequencer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claims the next index, returning the value before the increment.
    ///
    /// No upper bound is enforced; callers compare against their script.
    pub fn next_index(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::AcqRel)
    }

    /// Number of indices issued so far.
    #[must_use]
    pub fn served(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}
