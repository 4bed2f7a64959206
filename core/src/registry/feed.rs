use crate::api::ApiClient;
use crate::channel::{ChannelEvent, ChannelHandle, ConnectionState, EventStream, RealtimeChannel};
use crate::model::TrackedEntity;
use crate::prelude::DashboardResult;
use crate::registry::{ApplyOutcome, SharedRegistry};
use crate::telemetry::{FeedMetrics, LogManager, MetricsRecorder};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Source of full active-trip listings used to seed and resynchronize the registry.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch_snapshot(&self) -> impl Future<Output = DashboardResult<Vec<TrackedEntity>>> + Send;
}

/// Single consumer that applies channel events and periodic snapshots to the registry.
pub struct LiveFeed<S> {
    source: S,
    registry: SharedRegistry,
    metrics: Arc<MetricsRecorder>,
    refresh_interval: Duration,
    logger: LogManager,
}

impl<S: SnapshotSource> LiveFeed<S> {
    /// Intervals shorter than 100 ms (including zero) are raised to 100 ms.
    pub fn new(
        source: S,
        registry: SharedRegistry,
        metrics: Arc<MetricsRecorder>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            metrics,
            refresh_interval: refresh_interval.max(MIN_REFRESH_INTERVAL),
            logger: LogManager::new("tripcore::feed"),
        }
    }

    /// Runs until the event stream ends. The first refresh tick fires
    /// immediately and seeds the registry.
    pub async fn drive(self, mut events: EventStream) {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => self.refresh().await,
                event = events.next() => match event {
                    Some(event) => self.apply(event),
                    None => break,
                },
            }
        }
        self.logger.record("event stream ended; live updates stopped");
    }

    async fn refresh(&self) {
        match self.source.fetch_snapshot().await {
            Ok(trips) => {
                let outcome = self.registry.apply(ChannelEvent::SnapshotRefresh(trips));
                self.metrics.record_snapshot();
                if let ApplyOutcome::Replaced(count) = outcome {
                    self.logger.trace(&format!("snapshot refresh: {count} active trips"));
                }
            }
            Err(err) => {
                self.metrics.record_fetch_error();
                self.logger.warn(&format!("active trip refresh failed: {err}"));
            }
        }
    }

    fn apply(&self, event: ChannelEvent) {
        let id = event.entity_id().map(str::to_string);
        match self.registry.apply(event) {
            ApplyOutcome::Ignored => {
                self.metrics.record_ignored();
                self.logger
                    .trace(&format!("ignored event for unknown trip {:?}", id.unwrap_or_default()));
            }
            ApplyOutcome::Replaced(_) => self.metrics.record_snapshot(),
            _ => self.metrics.record_applied(),
        }
    }
}

impl LiveFeed<ApiClient> {
    /// Opens the live channel and spawns the consumer loop. Must be called
    /// inside a tokio runtime.
    pub fn start(api: ApiClient, registry: SharedRegistry) -> DashboardResult<FeedHandle> {
        let config = api.config();
        let url = config.live_socket_url()?;
        let channels = config.channels.clone();
        let refresh_interval = config.refresh_interval;
        let metrics = Arc::new(MetricsRecorder::new());

        let (channel, events, socket_task) = RealtimeChannel::open(&url, channels, metrics.clone());
        let feed = LiveFeed::new(api, registry.clone(), metrics.clone(), refresh_interval);
        let feed_task = tokio::spawn(feed.drive(events));

        Ok(FeedHandle {
            channel,
            registry,
            metrics,
            tasks: Arc::new(vec![socket_task.abort_handle(), feed_task.abort_handle()]),
        })
    }
}

/// Handle to a running feed, cheap to clone into UI messages.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    channel: ChannelHandle,
    registry: SharedRegistry,
    metrics: Arc<MetricsRecorder>,
    tasks: Arc<Vec<AbortHandle>>,
}

impl FeedHandle {
    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn channel(&self) -> &ChannelHandle {
        &self.channel
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> FeedMetrics {
        self.metrics.snapshot()
    }

    /// Aborts the socket and consumer tasks; queued events are discarded.
    pub fn stop(&self) {
        for task in self.tasks.iter() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::event_queue;
    use crate::model::{Position, TransportMode};
    use crate::prelude::DashboardError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct FixedSource {
        trips: Vec<TrackedEntity>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl SnapshotSource for FixedSource {
        async fn fetch_snapshot(&self) -> DashboardResult<Vec<TrackedEntity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DashboardError::Transport("connection refused".into()))
            } else {
                Ok(self.trips.clone())
            }
        }
    }

    fn trip(id: &str) -> TrackedEntity {
        TrackedEntity::new(id, Position::new(9.9, 76.2), TransportMode::Bus)
    }

    fn source(trips: Vec<TrackedEntity>, fail: bool) -> FixedSource {
        FixedSource {
            trips,
            calls: Arc::new(AtomicUsize::new(0)),
            fail,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn seeds_then_applies_queued_events_in_order() {
        let registry = SharedRegistry::new();
        let metrics = Arc::new(MetricsRecorder::new());
        let feed = LiveFeed::new(
            source(vec![trip("a"), trip("b")], false),
            registry.clone(),
            metrics.clone(),
            Duration::from_secs(30),
        );

        let (tx, events) = event_queue();
        tx.send(ChannelEvent::LocationUpdate {
            id: "a".into(),
            position: Position::new(10.0, 76.5),
        });
        tx.send(ChannelEvent::LocationUpdate {
            id: "ghost".into(),
            position: Position::new(0.0, 0.0),
        });
        tx.send(ChannelEvent::Completion {
            id: "b".into(),
            summary: None,
        });
        drop(tx);

        feed.drive(events).await;

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].trip_id, "a");
        assert_eq!(snapshot[0].location.lat, 10.0);

        let counts = metrics.snapshot();
        assert_eq!(counts.snapshots_applied, 1);
        assert_eq!(counts.events_applied, 2);
        assert_eq!(counts.events_ignored, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_leaves_registry_untouched() {
        let registry = SharedRegistry::new();
        registry.apply(ChannelEvent::Started(trip("kept")));
        let metrics = Arc::new(MetricsRecorder::new());
        let feed = LiveFeed::new(
            source(Vec::new(), true),
            registry.clone(),
            metrics.clone(),
            Duration::from_secs(30),
        );

        let (tx, events) = event_queue();
        drop(tx);
        feed.drive(events).await;

        assert_eq!(registry.len(), 1);
        assert_eq!(metrics.snapshot().fetch_errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_refresh_interval_still_seeds() {
        let registry = SharedRegistry::new();
        let fixed = source(vec![trip("a")], false);
        let calls = fixed.calls.clone();
        let feed = LiveFeed::new(
            fixed,
            registry.clone(),
            Arc::new(MetricsRecorder::new()),
            Duration::ZERO,
        );
        assert_eq!(feed.refresh_interval, MIN_REFRESH_INTERVAL);

        let (tx, events) = event_queue();
        let task = tokio::spawn(feed.drive(events));
        tokio::time::sleep(Duration::from_millis(250)).await;
        drop(tx);
        task.await.unwrap();

        assert_eq!(registry.len(), 1);
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_periodically_while_channel_is_open() {
        let registry = SharedRegistry::new();
        let fixed = source(vec![trip("a")], false);
        let calls = fixed.calls.clone();
        let feed = LiveFeed::new(
            fixed,
            registry.clone(),
            Arc::new(MetricsRecorder::new()),
            Duration::from_secs(30),
        );

        let (tx, events) = event_queue();
        let task = tokio::spawn(feed.drive(events));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(calls.load(Ordering::SeqCst) >= 2);

        drop(tx);
        task.await.unwrap();
        assert_eq!(registry.len(), 1);
    }
}
