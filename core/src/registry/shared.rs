use crate::channel::ChannelEvent;
use crate::model::TrackedEntity;
use crate::registry::{ApplyOutcome, LiveRegistry};
use std::sync::{Arc, PoisonError, RwLock};

/// Registry shared between the feed task (writer) and the view (reader).
///
/// Each event is applied under a single write lock, so a reader always sees
/// the full set as of some event boundary.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<LiveRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, event: ChannelEvent) -> ApplyOutcome {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(event)
    }

    pub fn snapshot(&self) -> Vec<TrackedEntity> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Snapshot together with the revision it was taken at.
    pub fn versioned_snapshot(&self) -> (u64, Vec<TrackedEntity>) {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        (guard.revision(), guard.snapshot())
    }

    pub fn revision(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .revision()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
