use crate::model::{Position, TrackedEntity, TripSummary};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Connection status of the live channel; drives the UI indicator only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Open => "Live",
            ConnectionState::Closed => "Disconnected",
        };
        f.write_str(label)
    }
}

/// Client → server control frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Subscribe { channels: Vec<String> },
    Unsubscribe { channels: Vec<String> },
}

/// Aggregates pushed every few seconds on the dashboard socket.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeriodicStats {
    #[serde(default)]
    pub active_users: u64,
    #[serde(default)]
    pub dashboard_connections: u64,
}

/// Server → client frame on `/ws/live-dashboard`, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionEstablished {
        #[serde(default)]
        message: String,
    },
    SubscriptionUpdated {
        #[serde(default)]
        subscribed_channels: Vec<String>,
    },
    LiveLocation {
        user_id: String,
        location: Position,
    },
    TripStarted {
        trip: TrackedEntity,
    },
    TripCompleted {
        user_id: String,
        #[serde(default)]
        trip_summary: Option<TripSummary>,
    },
    ActiveTrips {
        #[serde(default)]
        trips: Vec<TrackedEntity>,
    },
    PeriodicUpdate {
        #[serde(default)]
        data: PeriodicStats,
    },
    FoodEntry {
        user_id: String,
        #[serde(default)]
        food_summary: serde_json::Value,
    },
    #[serde(other)]
    Unrecognized,
}

impl ServerMessage {
    /// Subscription channel a broadcast message belongs to; `None` for
    /// frames every dashboard receives.
    pub fn channel(&self) -> Option<&'static str> {
        match self {
            ServerMessage::LiveLocation { .. }
            | ServerMessage::TripStarted { .. }
            | ServerMessage::ActiveTrips { .. } => Some("live_tracking"),
            ServerMessage::TripCompleted { .. } => Some("trip_completions"),
            ServerMessage::FoodEntry { .. } => Some("food_entries"),
            ServerMessage::ConnectionEstablished { .. }
            | ServerMessage::PeriodicUpdate { .. }
            | ServerMessage::SubscriptionUpdated { .. }
            | ServerMessage::Unrecognized => None,
        }
    }

    /// Registry-relevant event carried by this frame, if any.
    pub fn into_event(self) -> Option<ChannelEvent> {
        match self {
            ServerMessage::LiveLocation { user_id, location } => Some(ChannelEvent::LocationUpdate {
                id: user_id,
                position: location,
            }),
            ServerMessage::TripStarted { trip } => Some(ChannelEvent::Started(trip)),
            ServerMessage::TripCompleted {
                user_id,
                trip_summary,
            } => Some(ChannelEvent::Completion {
                id: user_id,
                summary: trip_summary,
            }),
            ServerMessage::ActiveTrips { trips } => Some(ChannelEvent::SnapshotRefresh(trips)),
            _ => None,
        }
    }
}

/// A single change to the live trip set, consumed once by the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    SnapshotRefresh(Vec<TrackedEntity>),
    Started(TrackedEntity),
    LocationUpdate {
        id: String,
        position: Position,
    },
    Completion {
        id: String,
        summary: Option<TripSummary>,
    },
}

impl ChannelEvent {
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            ChannelEvent::SnapshotRefresh(_) => None,
            ChannelEvent::Started(trip) => Some(&trip.trip_id),
            ChannelEvent::LocationUpdate { id, .. } | ChannelEvent::Completion { id, .. } => Some(id),
        }
    }
}

/// Producer side of the event queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: mpsc::UnboundedSender<ChannelEvent>,
}

impl EventSender {
    /// Returns `false` once the consumer has gone away.
    pub fn send(&self, event: ChannelEvent) -> bool {
        self.inner.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Consumer side of the event queue: arrival order, each event delivered once.
#[derive(Debug)]
pub struct EventStream {
    inner: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        self.inner.recv().await
    }

    pub fn try_next(&mut self) -> Option<ChannelEvent> {
        self.inner.try_recv().ok()
    }
}

pub fn event_queue() -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { inner: tx }, EventStream { inner: rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransportMode;

    #[test]
    fn live_location_becomes_location_update() {
        let frame = r#"{"type": "live_location", "user_id": "abc12345",
                        "location": {"lat": 9.98, "lng": 76.29}, "timestamp": "2024-12-26T10:00:00"}"#;
        let message: ServerMessage = serde_json::from_str(frame).unwrap();
        assert_eq!(message.channel(), Some("live_tracking"));
        assert_eq!(
            message.into_event(),
            Some(ChannelEvent::LocationUpdate {
                id: "abc12345".into(),
                position: Position::new(9.98, 76.29),
            })
        );
    }

    #[test]
    fn completion_keeps_summary() {
        let frame = r#"{"type": "trip_completed", "user_id": "abc12345",
                        "trip_summary": {"purpose": "work", "total_cost": 25.0,
                                         "modes_used": ["bus", "walk"], "duration_minutes": 40}}"#;
        let event = serde_json::from_str::<ServerMessage>(frame)
            .unwrap()
            .into_event()
            .unwrap();
        match event {
            ChannelEvent::Completion { id, summary } => {
                assert_eq!(id, "abc12345");
                let summary = summary.unwrap();
                assert_eq!(summary.modes_used, vec![TransportMode::Bus, TransportMode::Walk]);
                assert_eq!(summary.duration_minutes, 40);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_types_decode_without_event() {
        let message: ServerMessage =
            serde_json::from_str(r#"{"type": "mode_detection", "confidence": 0.9}"#).unwrap();
        assert_eq!(message, ServerMessage::Unrecognized);
        assert!(message.into_event().is_none());
    }

    #[test]
    fn control_message_wire_shape() {
        let json = serde_json::to_value(ControlMessage::Subscribe {
            channels: vec!["live_tracking".into(), "trip_completions".into()],
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "subscribe", "channels": ["live_tracking", "trip_completions"]})
        );
    }

    #[test]
    fn queue_preserves_arrival_order() {
        let (tx, mut rx) = event_queue();
        for id in ["a", "b", "c"] {
            assert!(tx.send(ChannelEvent::Completion {
                id: id.into(),
                summary: None
            }));
        }
        let order: Vec<String> = std::iter::from_fn(|| rx.try_next())
            .filter_map(|event| event.entity_id().map(str::to_string))
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
