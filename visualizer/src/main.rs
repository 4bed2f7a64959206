use charts::{LiveMap, ModeBars, TripHistogram};
use chrono::Local;
use iced::{
    time,
    widget::{button, column, row, scrollable, text, Canvas, Column, Container, Row},
    Alignment, Color, Element, Length, Subscription, Task, Theme,
};
use std::time::Duration;
use tripcore::api::{ApiClient, ApiConfig};
use tripcore::channel::ConnectionState;
use tripcore::model::TrackedEntity;
use tripcore::registry::{FeedHandle, LiveFeed, SharedRegistry};
use tripcore::telemetry::FeedMetrics;
use tripcore::view::controller::load;
use tripcore::view::{
    project, Accent, DashboardController, DashboardData, DashboardVariant, DashboardView,
    FetchRequest, MapMarker, Section, StatCard, TableView, TIME_FILTERS,
};

mod charts;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Dashboard::boot, Dashboard::update, Dashboard::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(state: &Dashboard) -> String {
    format!("Transport Survey Dashboard - {}", state.controller.current_request().variant)
}

fn application_subscription(_: &Dashboard) -> Subscription<Message> {
    time::every(Duration::from_secs(1)).map(|_| Message::Tick)
}

fn application_theme(_: &Dashboard) -> Theme {
    Theme::Dark
}

#[derive(Debug)]
struct Dashboard {
    api: Option<ApiClient>,
    controller: DashboardController,
    feed: Option<FeedHandle>,
    live: Vec<TrackedEntity>,
    live_revision: Option<u64>,
    connection: ConnectionState,
    metrics: FeedMetrics,
    selected_trip: Option<String>,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    FeedStarted(Result<FeedHandle, String>),
    DashboardLoaded(FetchRequest, Result<DashboardData, String>),
    Retry,
    Refresh,
    VariantSelected(DashboardVariant),
    DaysSelected(u32),
    TripSelected(String),
}

impl Dashboard {
    fn boot() -> (Self, Task<Message>) {
        let (api, status) = match ApiConfig::from_env().and_then(ApiClient::new) {
            Ok(api) => {
                let status = format!("Backend {}", api.config().base_url);
                (Some(api), status)
            }
            Err(err) => (None, format!("Configuration error: {err}")),
        };

        let mut state = Dashboard {
            api,
            controller: DashboardController::default(),
            feed: None,
            live: Vec::new(),
            live_revision: None,
            connection: ConnectionState::Connecting,
            metrics: FeedMetrics::default(),
            selected_trip: None,
            status,
            history: Vec::new(),
        };

        let request = state.controller.refresh();
        let task = Task::batch([state.fetch(request), state.start_feed()]);
        (state, task)
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                state.sync_live();
                Task::none()
            }
            Message::FeedStarted(Ok(feed)) => {
                state.feed = Some(feed);
                state.live_revision = None;
                state.push_history("Live feed started".into());
                Task::none()
            }
            Message::FeedStarted(Err(err)) => {
                state.status = format!("Live feed unavailable: {err}");
                state.push_history(state.status.clone());
                Task::none()
            }
            Message::DashboardLoaded(request, result) => {
                let outcome = match &result {
                    Ok(_) => format!("Loaded {} ({} days)", request.variant, request.days),
                    Err(err) => format!("Load failed: {err}"),
                };
                if state.controller.finish(request, result) {
                    state.push_history(outcome);
                }
                Task::none()
            }
            Message::Retry => match state.controller.retry() {
                Some(request) => {
                    state.push_history("Retrying".into());
                    state.fetch(request)
                }
                None => Task::none(),
            },
            Message::Refresh => {
                let request = state.controller.refresh();
                let restart = match &state.feed {
                    Some(feed) if feed.connection_state() == ConnectionState::Closed => {
                        feed.stop();
                        true
                    }
                    Some(_) => false,
                    None => true,
                };
                if restart {
                    state.feed = None;
                    state.push_history("Reconnecting live feed".into());
                    Task::batch([state.fetch(request), state.start_feed()])
                } else {
                    state.fetch(request)
                }
            }
            Message::VariantSelected(variant) => match state.controller.select_variant(variant) {
                Some(request) => state.fetch(request),
                None => Task::none(),
            },
            Message::DaysSelected(days) => match state.controller.select_days(days) {
                Some(request) => state.fetch(request),
                None => Task::none(),
            },
            Message::TripSelected(trip_id) => {
                state.selected_trip = match state.selected_trip.take() {
                    Some(current) if current == trip_id => None,
                    _ => Some(trip_id),
                };
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let request = state.controller.current_request();
        let page = project(
            request.variant,
            state.controller.data(),
            &state.live,
            state.connection,
        );

        let variant_buttons = DashboardVariant::ALL.iter().fold(
            Row::new().spacing(8),
            |row, variant| {
                let label = if *variant == request.variant {
                    format!("• {}", variant.label())
                } else {
                    variant.label().to_string()
                };
                row.push(
                    button(text(label))
                        .on_press(Message::VariantSelected(*variant))
                        .padding(8),
                )
            },
        );

        let mut controls = Row::new()
            .spacing(16)
            .align_y(Alignment::Center)
            .push(variant_buttons);
        if request.variant.uses_time_filter() {
            let days = TIME_FILTERS.iter().fold(Row::new().spacing(6), |row, days| {
                let label = if *days == request.days {
                    format!("• {days} days")
                } else {
                    format!("{days} days")
                };
                row.push(
                    button(text(label).size(13))
                        .on_press(Message::DaysSelected(*days))
                        .padding(6),
                )
            });
            controls = controls.push(days);
        }
        controls = controls.push(
            button("Refresh Data")
                .on_press(Message::Refresh)
                .padding(8),
        );

        let badge_color = if page.connection.live {
            Color::from_rgb(0.3, 0.8, 0.4)
        } else {
            Color::from_rgb(0.9, 0.4, 0.3)
        };
        let header = column![
            text(page.title.clone()).size(30),
            text(page.subtitle.clone()).size(15),
            row![
                text(format!("● {}", page.connection.label)).color(badge_color),
                text(page.active_trips.clone()),
                text(state.status.clone()).size(13),
            ]
            .spacing(16)
            .align_y(Alignment::Center),
            controls,
        ]
        .spacing(8);

        let mut body = Column::new().spacing(16);
        if let Some(message) = state.controller.error() {
            body = body.push(alert(message));
        } else if state.controller.is_loading() && state.controller.data().is_none() {
            body = body.push(text("Loading dashboard...").size(18));
        }
        if !page.cards.is_empty() {
            body = body.push(
                page.cards
                    .iter()
                    .fold(Row::new().spacing(12), |row, card| row.push(card_view(card))),
            );
        }
        body = body.push(analysis_panel(&page));
        body = body.push(live_panel(&page, state.selected_trip.as_deref()));
        for table in &page.tables {
            body = body.push(table_view(table));
        }
        body = body.push(activity_panel(state));

        let layout = column![header, scrollable(body).height(Length::Fill)]
            .spacing(16)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn fetch(&self, request: FetchRequest) -> Task<Message> {
        match &self.api {
            Some(api) => {
                let api = api.clone();
                Task::perform(async move { load(&api, request).await }, |(request, result)| {
                    Message::DashboardLoaded(request, result)
                })
            }
            None => Task::done(Message::DashboardLoaded(
                request,
                Err(self.status.clone()),
            )),
        }
    }

    fn start_feed(&self) -> Task<Message> {
        match &self.api {
            Some(api) => Task::perform(start_feed(api.clone()), Message::FeedStarted),
            None => Task::none(),
        }
    }

    fn sync_live(&mut self) {
        let Some(feed) = self.feed.clone() else {
            return;
        };

        let (revision, live) = feed.registry().versioned_snapshot();
        if self.live_revision != Some(revision) {
            self.live = live;
            self.live_revision = Some(revision);
            if let Some(selected) = &self.selected_trip {
                if !self.live.iter().any(|trip| &trip.trip_id == selected) {
                    self.selected_trip = None;
                }
            }
        }

        let connection = feed.connection_state();
        if connection != self.connection {
            self.connection = connection;
            self.push_history(format!("Live channel: {connection}"));
        }
        self.metrics = feed.metrics();
    }

    fn push_history(&mut self, entry: String) {
        log::info!("{}", entry);
        self.history
            .push(format!("{} {}", Local::now().format("%H:%M:%S"), entry));
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

async fn start_feed(api: ApiClient) -> Result<FeedHandle, String> {
    LiveFeed::start(api, SharedRegistry::new()).map_err(|e| e.to_string())
}

fn accent_color(accent: Accent) -> Color {
    match accent {
        Accent::Primary => Color::from_rgb(0.26, 0.55, 0.93),
        Accent::Success => Color::from_rgb(0.3, 0.69, 0.31),
        Accent::Info => Color::from_rgb(0.16, 0.71, 0.96),
        Accent::Warning => Color::from_rgb(1.0, 0.6, 0.0),
        Accent::Neutral => Color::from_rgb(0.8, 0.8, 0.85),
    }
}

fn alert<'a>(message: &str) -> Element<'a, Message> {
    Container::new(
        row![
            text(format!("Error: {message}")).color(Color::from_rgb(0.96, 0.36, 0.33)),
            button("Retry").on_press(Message::Retry).padding(8),
        ]
        .spacing(16)
        .align_y(Alignment::Center),
    )
    .padding(12)
    .width(Length::Fill)
    .into()
}

fn card_view<'a>(card: &StatCard) -> Element<'a, Message> {
    let mut body = column![
        text(card.title.clone()).size(14),
        text(card.value.clone())
            .size(26)
            .color(accent_color(card.accent)),
    ]
    .spacing(4);
    if let Some(caption) = &card.caption {
        body = body.push(text(caption.clone()).size(12));
    }
    Container::new(body)
        .padding(12)
        .width(Length::Fill)
        .into()
}

fn section_view<'a>(section: &Section) -> Element<'a, Message> {
    section
        .lines
        .iter()
        .fold(
            Column::new()
                .spacing(6)
                .push(text(section.title.clone()).size(18)),
            |col, (name, value)| {
                col.push(text(name.clone()).size(13))
                    .push(text(value.clone()).size(12))
            },
        )
        .width(Length::Fill)
        .into()
}

fn analysis_panel<'a>(page: &DashboardView) -> Element<'a, Message> {
    let bars_height = (page.mode_shares.len().max(1) as f32 * 36.0).min(320.0);
    let mut panel = Column::new().spacing(10).push(
        text("Transport Mode Distribution").size(18),
    );
    panel = panel.push(
        Canvas::new(ModeBars {
            shares: page.mode_shares.clone(),
        })
        .width(Length::Fill)
        .height(Length::Fixed(bars_height)),
    );

    if !page.temporal.is_empty() {
        panel = panel.push(text("Hourly Trip Patterns").size(18)).push(
            Canvas::new(TripHistogram {
                points: page.temporal.clone(),
            })
            .width(Length::Fill)
            .height(Length::Fixed(200.0)),
        );
    }

    if !page.sections.is_empty() {
        panel = panel.push(
            page.sections
                .iter()
                .fold(Row::new().spacing(24), |row, section| {
                    row.push(section_view(section))
                }),
        );
    }
    panel.into()
}

fn live_panel<'a>(page: &DashboardView, selected: Option<&str>) -> Element<'a, Message> {
    let map = Canvas::new(LiveMap {
        markers: page.markers.clone(),
        viewport: page.viewport,
        selected: selected.map(str::to_string),
    })
    .width(Length::FillPortion(3))
    .height(Length::Fixed(320.0));

    let trips = if page.markers.is_empty() {
        Column::new().push(text("No active trips").size(12))
    } else {
        page.markers
            .iter()
            .fold(Column::new().spacing(4), |col, marker| {
                col.push(
                    button(text(format!("{} {}", marker.glyph, marker.trip_id)).size(12))
                        .on_press(Message::TripSelected(marker.trip_id.clone()))
                        .padding(4),
                )
            })
    };

    let popup = page
        .markers
        .iter()
        .find(|marker| Some(marker.trip_id.as_str()) == selected)
        .map(popup_view)
        .unwrap_or_else(|| text("Select a trip for details").size(12).into());

    column![
        text(format!("Live Tracking - {}", page.active_trips)).size(18),
        row![
            map,
            column![
                scrollable(trips).height(Length::Fixed(200.0)),
                popup,
            ]
            .spacing(10)
            .width(Length::FillPortion(1)),
        ]
        .spacing(12),
    ]
    .spacing(10)
    .into()
}

fn popup_view<'a>(marker: &MapMarker) -> Element<'a, Message> {
    marker
        .popup
        .iter()
        .fold(
            Column::new()
                .spacing(2)
                .push(text(marker.title.clone()).size(14)),
            |col, line| col.push(text(line.clone()).size(12)),
        )
        .into()
}

fn table_view<'a>(table: &TableView) -> Element<'a, Message> {
    let header = table
        .headers
        .iter()
        .fold(Row::new().spacing(8), |row, cell| {
            row.push(text(cell.clone()).size(13).width(Length::FillPortion(1)))
        });
    let rows = if table.rows.is_empty() {
        Column::new().push(text("No records").size(12))
    } else {
        table.rows.iter().fold(Column::new().spacing(4), |col, cells| {
            col.push(cells.iter().fold(Row::new().spacing(8), |row, cell| {
                row.push(text(cell.clone()).size(12).width(Length::FillPortion(1)))
            }))
        })
    };
    column![text(table.title.clone()).size(18), header, rows]
        .spacing(6)
        .into()
}

fn activity_panel<'a>(state: &Dashboard) -> Element<'a, Message> {
    let metrics = state.metrics;
    let history = if state.history.is_empty() {
        Column::new().push(text("No activity yet").size(12))
    } else {
        state
            .history
            .iter()
            .rev()
            .fold(Column::new().spacing(4), |col, entry| {
                col.push(text(entry.clone()).size(12))
            })
    };
    column![
        text("Activity log").size(16),
        text(format!(
            "events applied {} | ignored {} | snapshots {} | refresh errors {} | dropped frames {}",
            metrics.events_applied,
            metrics.events_ignored,
            metrics.snapshots_applied,
            metrics.fetch_errors,
            metrics.frames_dropped
        ))
        .size(12),
        Container::new(scrollable(history).height(Length::Fixed(120.0))).padding(6),
    ]
    .spacing(6)
    .into()
}
