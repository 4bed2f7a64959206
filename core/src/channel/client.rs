use crate::channel::event::{
    event_queue, ConnectionState, ControlMessage, EventSender, EventStream, ServerMessage,
};
use crate::telemetry::{LogManager, MetricsRecorder};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Control side of an open channel: connection status and subscription messages.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    control: mpsc::UnboundedSender<ControlMessage>,
    state: watch::Receiver<ConnectionState>,
}

impl ChannelHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Fire-and-forget; silently dropped once the connection has ended.
    pub fn send(&self, message: ControlMessage) {
        let _ = self.control.send(message);
    }

    pub fn subscribe<S: AsRef<str>>(&self, channels: &[S]) {
        self.send(ControlMessage::Subscribe {
            channels: channels.iter().map(|c| c.as_ref().to_string()).collect(),
        });
    }

    pub fn unsubscribe<S: AsRef<str>>(&self, channels: &[S]) {
        self.send(ControlMessage::Unsubscribe {
            channels: channels.iter().map(|c| c.as_ref().to_string()).collect(),
        });
    }
}

/// One logical subscription to the live dashboard socket.
pub struct RealtimeChannel;

impl RealtimeChannel {
    /// Spawns the connection task. Must be called inside a tokio runtime.
    ///
    /// The returned stream ends when the connection closes; it is not restartable.
    pub fn open(
        url: &str,
        channels: Vec<String>,
        metrics: Arc<MetricsRecorder>,
    ) -> (ChannelHandle, EventStream, JoinHandle<()>) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (events_tx, events) = event_queue();
        let url = url.to_string();

        let task = tokio::spawn(async move {
            let logger = LogManager::new("tripcore::channel");
            match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((socket, _response)) => {
                    logger.record(&format!("connected to {url}"));
                    let (write, read) = socket.split();
                    pump(
                        read, write, channels, control_rx, events_tx, state_tx, metrics,
                    )
                    .await;
                }
                Err(err) => {
                    logger.warn(&format!("connecting to {url} failed: {err}"));
                    let _ = state_tx.send(ConnectionState::Closed);
                }
            }
        });

        (
            ChannelHandle {
                control: control_tx,
                state: state_rx,
            },
            events,
            task,
        )
    }
}

/// Drives an established socket until the server closes it, the transport
/// fails, or the event consumer goes away.
pub(crate) async fn pump<R, W>(
    mut read: R,
    mut write: W,
    channels: Vec<String>,
    mut control: mpsc::UnboundedReceiver<ControlMessage>,
    events: EventSender,
    state: watch::Sender<ConnectionState>,
    metrics: Arc<MetricsRecorder>,
) where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let logger = LogManager::new("tripcore::channel");
    let _ = state.send(ConnectionState::Open);

    if !channels.is_empty() {
        let subscribe = ControlMessage::Subscribe { channels };
        if let Err(err) = send_control(&mut write, &subscribe).await {
            logger.warn(&format!("subscribe failed: {err}"));
        }
    }

    let mut control_open = true;
    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(message) => {
                                if let Some(event) = message.into_event() {
                                    if !events.send(event) {
                                        logger.trace("event consumer dropped; closing channel");
                                        break;
                                    }
                                }
                            }
                            Err(err) => {
                                metrics.record_dropped_frame();
                                logger.warn(&format!("skipping malformed frame: {err}"));
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        logger.record(&format!("server closed channel: {frame:?}"));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        logger.warn(&format!("channel transport error: {err}"));
                        break;
                    }
                    None => break,
                }
            }
            command = control.recv(), if control_open => {
                match command {
                    Some(message) => {
                        if let Err(err) = send_control(&mut write, &message).await {
                            logger.warn(&format!("control message failed: {err}"));
                        }
                    }
                    None => control_open = false,
                }
            }
        }
    }

    let _ = state.send(ConnectionState::Closed);
}

async fn send_control<W>(write: &mut W, message: &ControlMessage) -> Result<(), String>
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let json = serde_json::to_string(message).map_err(|e| e.to_string())?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::event::ChannelEvent;
    use futures_util::{sink, stream};
    use std::sync::Mutex;
    use std::time::Duration;

    fn text(frame: &str) -> Result<Message, WsError> {
        Ok(Message::Text(frame.to_string().into()))
    }

    #[tokio::test]
    async fn pump_forwards_events_in_order_and_closes() {
        let frames = vec![
            text(r#"{"type": "connection_established", "message": "hi"}"#),
            text(r#"{"type": "live_location", "user_id": "t1", "location": {"lat": 1.0, "lng": 2.0}}"#),
            text("not json"),
            Ok(Message::Binary(vec![1, 2, 3].into())),
            text(r#"{"type": "trip_completed", "user_id": "t1"}"#),
        ];
        let (_control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (events_tx, mut events) = event_queue();
        let metrics = Arc::new(MetricsRecorder::new());

        pump(
            stream::iter(frames),
            sink::drain(),
            vec!["live_tracking".into()],
            control_rx,
            events_tx,
            state_tx,
            metrics.clone(),
        )
        .await;

        assert_eq!(*state_rx.borrow(), ConnectionState::Closed);
        assert!(matches!(
            events.next().await,
            Some(ChannelEvent::LocationUpdate { ref id, .. }) if id == "t1"
        ));
        assert!(matches!(
            events.next().await,
            Some(ChannelEvent::Completion { ref id, .. }) if id == "t1"
        ));
        assert!(events.next().await.is_none());
        assert_eq!(metrics.snapshot().frames_dropped, 1);
    }

    #[tokio::test]
    async fn pump_stops_when_consumer_is_gone() {
        let frames = vec![
            text(r#"{"type": "trip_completed", "user_id": "a"}"#),
            text(r#"{"type": "trip_completed", "user_id": "b"}"#),
        ];
        let (_control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (events_tx, events) = event_queue();
        drop(events);

        pump(
            stream::iter(frames),
            sink::drain(),
            Vec::new(),
            control_rx,
            events_tx,
            state_tx,
            Arc::new(MetricsRecorder::new()),
        )
        .await;

        assert_eq!(*state_rx.borrow(), ConnectionState::Closed);
    }

    fn control_frame(frame: &Message) -> serde_json::Value {
        match frame {
            Message::Text(text) => serde_json::from_str(text).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pump_subscribes_on_open_and_forwards_control_messages() {
        let sent = Arc::new(Mutex::new(Vec::<Message>::new()));
        let capture = Box::pin(sink::unfold(sent.clone(), |sent, frame: Message| async move {
            sent.lock().unwrap().push(frame);
            Ok::<_, WsError>(sent)
        }));

        let (frames_tx, frames_rx) = mpsc::unbounded_channel::<Result<Message, WsError>>();
        let read = Box::pin(stream::unfold(frames_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        }));

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let handle = ChannelHandle {
            control: control_tx,
            state: state_rx,
        };
        let (events_tx, _events) = event_queue();

        let task = tokio::spawn(pump(
            read,
            capture,
            vec!["live_tracking".into(), "trip_completions".into()],
            control_rx,
            events_tx,
            state_tx,
            Arc::new(MetricsRecorder::new()),
        ));

        handle.unsubscribe(&["live_tracking"]);
        for _ in 0..100 {
            if sent.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(handle.state(), ConnectionState::Open);

        drop(frames_tx);
        task.await.unwrap();
        assert_eq!(handle.state(), ConnectionState::Closed);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            control_frame(&sent[0]),
            serde_json::json!({"type": "subscribe", "channels": ["live_tracking", "trip_completions"]})
        );
        assert_eq!(
            control_frame(&sent[1]),
            serde_json::json!({"type": "unsubscribe", "channels": ["live_tracking"]})
        );
    }

    #[tokio::test]
    async fn failed_connect_reports_closed() {
        let (handle, mut events, task) = RealtimeChannel::open(
            "ws://127.0.0.1:9/ws/live-dashboard",
            vec!["live_tracking".into()],
            Arc::new(MetricsRecorder::new()),
        );
        task.await.unwrap();
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(events.next().await.is_none());
        handle.subscribe(&["trip_completions"]);
    }
}
