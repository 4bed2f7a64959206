//! Live trip registry.
//!
//! Holds the set of active trips keyed by `trip_id` and applies channel events
//! to it in arrival order. Updates are idempotent by id, so duplicated or
//! dropped frames from the transport never fabricate or double-count a trip.

pub mod feed;
pub mod shared;

pub use feed::{FeedHandle, LiveFeed, SnapshotSource};
pub use shared::SharedRegistry;

use crate::channel::ChannelEvent;
use crate::model::{Position, TrackedEntity};

/// What applying one event did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Replaced(usize),
    Inserted,
    Updated,
    Removed,
    Ignored,
}

impl ApplyOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, ApplyOutcome::Ignored)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LiveRegistry {
    entities: Vec<TrackedEntity>,
    revision: u64,
}

impl LiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(entities: Vec<TrackedEntity>) -> Self {
        let mut registry = Self::new();
        registry.replace_all(entities);
        registry
    }

    pub fn apply(&mut self, event: ChannelEvent) -> ApplyOutcome {
        let outcome = match event {
            ChannelEvent::SnapshotRefresh(entities) => {
                ApplyOutcome::Replaced(self.replace_all(entities))
            }
            ChannelEvent::Started(entity) => self.upsert(entity),
            ChannelEvent::LocationUpdate { id, position } => self.move_to(&id, position),
            ChannelEvent::Completion { id, .. } => self.remove(&id),
        };
        if outcome.changed() {
            self.revision += 1;
        }
        outcome
    }

    /// Replaces the full set. Duplicate ids collapse to the last occurrence,
    /// kept at the slot of the first.
    fn replace_all(&mut self, entities: Vec<TrackedEntity>) -> usize {
        self.entities.clear();
        for entity in entities {
            match self.index_of(&entity.trip_id) {
                Some(idx) => self.entities[idx] = entity,
                None => self.entities.push(entity),
            }
        }
        self.entities.len()
    }

    fn upsert(&mut self, entity: TrackedEntity) -> ApplyOutcome {
        match self.index_of(&entity.trip_id) {
            Some(idx) => {
                self.entities[idx] = entity;
                ApplyOutcome::Updated
            }
            None => {
                self.entities.push(entity);
                ApplyOutcome::Inserted
            }
        }
    }

    fn move_to(&mut self, id: &str, position: Position) -> ApplyOutcome {
        let Some(idx) = self.index_of(id) else {
            return ApplyOutcome::Ignored;
        };
        let location = &mut self.entities[idx].location;
        location.lat = position.lat;
        location.lng = position.lng;
        if position.name.is_some() {
            location.name = position.name;
        }
        ApplyOutcome::Updated
    }

    fn remove(&mut self, id: &str) -> ApplyOutcome {
        match self.index_of(id) {
            Some(idx) => {
                self.entities.remove(idx);
                ApplyOutcome::Removed
            }
            None => ApplyOutcome::Ignored,
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.entities.iter().position(|entity| entity.trip_id == id)
    }

    pub fn get(&self, id: &str) -> Option<&TrackedEntity> {
        self.entities.iter().find(|entity| entity.trip_id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Copy of the current set in insertion order.
    pub fn snapshot(&self) -> Vec<TrackedEntity> {
        self.entities.clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
