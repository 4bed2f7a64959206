use crate::workflow::runner::Runner;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tripcore::channel::{PeriodicStats, ServerMessage};
use tripcore::model::TrackedEntity;

const UPDATE_BACKLOG: usize = 256;

/// State shared by the HTTP routes, the dashboard sockets and the tick task.
pub struct BridgeState {
    pub runner: Runner,
    token: Option<String>,
    active: RwLock<Vec<TrackedEntity>>,
    updates: broadcast::Sender<ServerMessage>,
    connections: AtomicUsize,
}

impl BridgeState {
    pub fn new(runner: Runner, token: Option<String>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BACKLOG);
        Self {
            active: RwLock::new(runner.initial_active()),
            runner,
            token,
            updates,
            connections: AtomicUsize::new(0),
        }
    }

    /// Checks an `Authorization` header value against the configured token.
    pub fn authorize(&self, header: Option<&str>) -> bool {
        match &self.token {
            None => true,
            Some(expected) => header
                .and_then(|value| value.strip_prefix("Bearer "))
                .map_or(false, |given| given.trim() == expected),
        }
    }

    pub fn active_trips(&self) -> Vec<TrackedEntity> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn with_active<R>(&self, f: impl FnOnce(&mut Vec<TrackedEntity>) -> R) -> R {
        let mut guard = self.active.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Fans a frame out to every open dashboard. Returns how many got it.
    pub fn publish(&self, message: ServerMessage) -> usize {
        self.updates.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.updates.subscribe()
    }

    pub fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> PeriodicStats {
        PeriodicStats {
            active_users: self.active_trips().len() as u64,
            dashboard_connections: self.connections.load(Ordering::Relaxed) as u64,
        }
    }
}
