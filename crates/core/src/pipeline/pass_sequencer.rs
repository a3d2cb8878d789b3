use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one detection pass. Monotonically increasing per sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PassId(u64);

/// Hands out pass ids and answers whether a finished pass is still the
/// latest one started.
///
/// A completed inference result is applied only if its pass id is current;
/// anything older is discarded, so a slow pass can never overwrite the
/// output of a newer one.
#[derive(Debug, Default)]
pub struct PassSequencer {
    latest: AtomicU64,
}

impl PassSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> PassId {
        PassId(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, id: PassId) -> bool {
        self.latest.load(Ordering::SeqCst) == id.0
    }
}
