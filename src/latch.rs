use std::sync::atomic::{AtomicBool, Ordering};

/// A flag that can be taken exactly once.
///
/// Guards every entry point that may try to settle a promise more than once:
/// resolver callbacks, thenable callbacks and combinator aggregates.
#[derive(Debug, Default)]
pub(crate) struct Latch {
    fired: AtomicBool,
}

impl Latch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller only.
    pub(crate) fn fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
