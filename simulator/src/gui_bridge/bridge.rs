use crate::generator::movement::MovementModel;
use crate::gui_bridge::model::BridgeState;
use crate::workflow::runner::Runner;
use anyhow::Context;
use chrono::Utc;
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant};
use tripcore::channel::{ControlMessage, ServerMessage};
use tripcore::model::{ApiEnvelope, Granularity};
use warp::http::StatusCode;
use warp::ws::{Message, WebSocket, Ws};
use warp::{Filter, Rejection, Reply};

#[derive(Debug)]
struct AccessDenied;

impl warp::reject::Reject for AccessDenied {}

fn default_days() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
    #[serde(default = "default_days")]
    days: u32,
    #[serde(default)]
    granularity: Granularity,
}

/// Hosts the analytics endpoints and the live dashboard socket.
pub struct GuiBridge {
    state: Arc<BridgeState>,
}

impl GuiBridge {
    pub fn new(runner: Runner, token: Option<String>) -> Self {
        Self {
            state: Arc::new(BridgeState::new(runner, token)),
        }
    }

    pub fn state(&self) -> Arc<BridgeState> {
        self.state.clone()
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        routes(self.state.clone())
    }

    /// Moves the live trips every `tick` and pushes connection stats every `periodic`.
    pub fn spawn_movement(
        &self,
        mut model: MovementModel,
        tick: Duration,
        periodic: Duration,
    ) -> JoinHandle<()> {
        let state = self.state.clone();
        tokio::spawn(async move {
            let mut ticker = interval(tick);
            let mut stats = interval_at(Instant::now() + periodic, periodic);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let messages = state.with_active(|active| model.step(active, Utc::now()));
                        for message in messages {
                            state.publish(message);
                        }
                    }
                    _ = stats.tick() => {
                        state.publish(ServerMessage::PeriodicUpdate { data: state.stats() });
                    }
                }
            }
        })
    }

    pub async fn serve(
        &self,
        bind: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (addr, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(bind, shutdown)
            .with_context(|| format!("binding {bind}"))?;
        self.publish_status(&format!("serving on http://{addr} (live socket ws://{addr}/ws/live-dashboard)"));
        server.await;
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        log::info!("[bridge] {}", message);
    }
}

fn with_state(
    state: Arc<BridgeState>,
) -> impl Filter<Extract = (Arc<BridgeState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn authorized(state: Arc<BridgeState>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and_then(move |header: Option<String>| {
            let state = state.clone();
            async move {
                if state.authorize(header.as_deref()) {
                    Ok::<(), Rejection>(())
                } else {
                    Err(warp::reject::custom(AccessDenied))
                }
            }
        })
        .untuple_one()
}

fn routes(state: Arc<BridgeState>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let guarded = warp::get()
        .and(authorized(state.clone()))
        .and(with_state(state.clone()));

    let summary_route = warp::path!("api" / "v1" / "analytics" / "dashboard-summary")
        .and(guarded.clone())
        .map(|state: Arc<BridgeState>| {
            warp::reply::json(&ApiEnvelope::ok(state.runner.dashboard_summary()))
        });

    let trips_route = warp::path!("api" / "v1" / "trips")
        .and(guarded.clone())
        .map(|state: Arc<BridgeState>| warp::reply::json(&ApiEnvelope::ok(state.runner.trips().to_vec())));

    let food_route = warp::path!("api" / "v1" / "food")
        .and(guarded.clone())
        .map(|state: Arc<BridgeState>| warp::reply::json(&ApiEnvelope::ok(state.runner.food().to_vec())));

    let overview_route = warp::path!("analytics" / "dashboard" / "overview")
        .and(guarded.clone())
        .and(warp::query::<WindowQuery>())
        .map(|state: Arc<BridgeState>, query: WindowQuery| {
            warp::reply::json(&state.runner.overview(query.days, Utc::now()))
        });

    let mode_split_route = warp::path!("analytics" / "trips" / "mode-split")
        .and(guarded.clone())
        .and(warp::query::<WindowQuery>())
        .map(|state: Arc<BridgeState>, query: WindowQuery| {
            warp::reply::json(&state.runner.mode_split(query.days, Utc::now()))
        });

    let temporal_route = warp::path!("analytics" / "trips" / "temporal-patterns")
        .and(guarded.clone())
        .and(warp::query::<WindowQuery>())
        .map(|state: Arc<BridgeState>, query: WindowQuery| {
            warp::reply::json(&state.runner.temporal_patterns(
                query.days,
                query.granularity,
                Utc::now(),
            ))
        });

    let active_route = warp::path!("analytics" / "live" / "active-trips")
        .and(guarded)
        .map(|state: Arc<BridgeState>| warp::reply::json(&state.active_trips()));

    let socket_route = warp::path!("ws" / "live-dashboard")
        .and(warp::ws())
        .and(with_state(state))
        .map(|ws: Ws, state: Arc<BridgeState>| {
            ws.on_upgrade(move |socket| dashboard_session(socket, state))
        });

    summary_route
        .or(trips_route)
        .or(food_route)
        .or(overview_route)
        .or(mode_split_route)
        .or(temporal_route)
        .or(active_route)
        .or(socket_route)
        .recover(handle_rejection)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.find::<AccessDenied>().is_some() {
        (StatusCode::FORBIDDEN, "Access denied")
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::UNPROCESSABLE_ENTITY, "Invalid query parameters")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found")
    } else {
        log::warn!("unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "detail": detail })),
        status,
    ))
}

fn apply_control(channels: &mut BTreeSet<String>, control: ControlMessage) {
    match control {
        ControlMessage::Subscribe { channels: added } => channels.extend(added),
        ControlMessage::Unsubscribe { channels: removed } => {
            for channel in removed {
                channels.remove(&channel);
            }
        }
    }
}

fn delivers(channels: &BTreeSet<String>, message: &ServerMessage) -> bool {
    message.channel().map_or(true, |channel| channels.contains(channel))
}

async fn send_frame<S>(sink: &mut S, message: &ServerMessage) -> Result<(), warp::Error>
where
    S: Sink<Message, Error = warp::Error> + Unpin,
{
    match serde_json::to_string(message) {
        Ok(text) => sink.send(Message::text(text)).await,
        Err(err) => {
            log::warn!("dropping unencodable frame: {}", err);
            Ok(())
        }
    }
}

/// One dashboard connection: control frames in, subscribed broadcasts out.
async fn dashboard_session(socket: WebSocket, state: Arc<BridgeState>) {
    let (mut sink, mut stream) = socket.split();
    let mut updates = state.subscribe();
    let mut channels = BTreeSet::new();
    state.connection_opened();
    log::info!(
        "dashboard connected ({} open)",
        state.stats().dashboard_connections
    );

    let welcome = ServerMessage::ConnectionEstablished {
        message: "Connected to live dashboard".to_string(),
    };
    if send_frame(&mut sink, &welcome).await.is_ok() {
        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(frame)) if frame.is_close() => break,
                    Some(Ok(frame)) => {
                        let Ok(text) = frame.to_str() else { continue };
                        match serde_json::from_str::<ControlMessage>(text) {
                            Ok(control) => {
                                apply_control(&mut channels, control);
                                let reply = ServerMessage::SubscriptionUpdated {
                                    subscribed_channels: channels.iter().cloned().collect(),
                                };
                                if send_frame(&mut sink, &reply).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => log::warn!("ignoring control frame: {}", err),
                        }
                    }
                    Some(Err(err)) => {
                        log::debug!("dashboard socket error: {}", err);
                        break;
                    }
                    None => break,
                },
                update = updates.recv() => match update {
                    Ok(message) => {
                        if delivers(&channels, &message) && send_frame(&mut sink, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("dashboard lagging; {} updates dropped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    state.connection_closed();
    log::info!("dashboard disconnected");
}
