use std::sync::{Arc, PoisonError, RwLock};
use crate::snapshot::Snapshot;

/// Holds the one current snapshot.
///
/// Readers clone an `Arc` and then work lock-free on an immutable value, so a
/// reader holds either the previous or the new snapshot in full. The lock is
/// held only for the pointer copy or swap.
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    pub fn get(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replace the current snapshot. Only the aggregation engine calls this.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, Arc::clone(&snapshot))
        };

        tracing::debug!(
            previous = previous.sequence,
            current = snapshot.sequence,
            "Snapshot published"
        );

        snapshot
    }

    pub fn sequence(&self) -> u64 {
        self.get().sequence
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
