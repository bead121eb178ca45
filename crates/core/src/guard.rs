//! Single-in-flight guard for capture/restore/backup operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Busy flag shared by everything that mutates the live window set or the
/// retention indexes. Exactly one operation may hold a permit at a time; a
/// second attempt is rejected, never queued. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct OperationGuard {
    busy: Arc<AtomicBool>,
}

impl OperationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the guard, or returns `None` while another operation is in
    /// flight. The permit releases the guard on drop.
    pub fn try_acquire(&self) -> Option<OperationPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .ok()
            .map(|_| OperationPermit { busy: Arc::clone(&self.busy) })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[must_use = "dropping the permit releases the guard immediately"]
pub struct OperationPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for OperationPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
