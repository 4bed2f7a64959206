use iced::{
    mouse,
    widget::canvas::{self, Frame, Geometry, Path, Stroke},
    Color, Pixels, Point, Rectangle, Renderer, Size, Theme,
};
use tripcore::view::{MapMarker, MapViewport, ModeShare, Rgb, TemporalPoint};

const BACKGROUND: Color = Color::from_rgb(0.05, 0.05, 0.07);
const GRID: Color = Color::from_rgb(0.22, 0.22, 0.28);
const LABEL: Color = Color::from_rgb(0.85, 0.85, 0.9);
const BAR: Color = Color::from_rgb(0.18, 0.49, 0.2);

fn rgb(color: Rgb) -> Color {
    let [r, g, b] = color.to_f32();
    Color::from_rgb(r, g, b)
}

fn label(frame: &mut Frame, content: String, position: Point, size: f32) {
    frame.fill_text(canvas::Text {
        content,
        position,
        color: LABEL,
        size: Pixels(size),
        ..canvas::Text::default()
    });
}

/// Horizontal share bars, one row per mode.
#[derive(Clone)]
pub struct ModeBars {
    pub shares: Vec<ModeShare>,
}

impl<Message> canvas::Program<Message> for ModeBars {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), BACKGROUND);

        if self.shares.is_empty() {
            label(&mut frame, "No trips in this period".into(), Point::new(12.0, 12.0), 14.0);
            return vec![frame.into_geometry()];
        }

        let row_height = (bounds.height / self.shares.len() as f32).min(36.0);
        let bar_left = 130.0_f32.min(bounds.width / 3.0);
        let bar_width = (bounds.width - bar_left - 12.0).max(0.0);

        for (idx, share) in self.shares.iter().enumerate() {
            let top = idx as f32 * row_height;
            label(&mut frame, share.mode.clone(), Point::new(8.0, top + 4.0), 13.0);
            frame.fill_rectangle(
                Point::new(bar_left, top + 6.0),
                Size::new(bar_width, row_height * 0.35),
                GRID,
            );
            let filled = bar_width * (share.percentage as f32 / 100.0).clamp(0.0, 1.0);
            frame.fill_rectangle(
                Point::new(bar_left, top + 6.0),
                Size::new(filled, row_height * 0.35),
                BAR,
            );
            label(
                &mut frame,
                share.label.clone(),
                Point::new(bar_left, top + 6.0 + row_height * 0.4),
                11.0,
            );
        }

        vec![frame.into_geometry()]
    }
}

/// Trip counts per time bucket.
#[derive(Clone)]
pub struct TripHistogram {
    pub points: Vec<TemporalPoint>,
}

impl<Message> canvas::Program<Message> for TripHistogram {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), BACKGROUND);

        let max = self.points.iter().map(|p| p.trips).max().unwrap_or(0).max(1) as f32;
        let axis_height = 18.0;
        let plot_height = (bounds.height - axis_height - 8.0).max(1.0);
        let slot = bounds.width / self.points.len().max(1) as f32;

        let axis = Path::line(
            Point::new(0.0, plot_height + 4.0),
            Point::new(bounds.width, plot_height + 4.0),
        );
        frame.stroke(&axis, Stroke::default().with_color(GRID).with_width(1.0));

        for (idx, point) in self.points.iter().enumerate() {
            let height = point.trips as f32 / max * plot_height;
            let x = idx as f32 * slot + slot * 0.15;
            frame.fill_rectangle(
                Point::new(x, plot_height + 4.0 - height),
                Size::new(slot * 0.7, height),
                BAR,
            );
            if self.points.len() <= 12 || idx % 2 == 0 {
                label(
                    &mut frame,
                    point.label.clone(),
                    Point::new(x, plot_height + 6.0),
                    10.0,
                );
            }
        }

        vec![frame.into_geometry()]
    }
}

/// Live trips over a lat/lng grid.
#[derive(Clone)]
pub struct LiveMap {
    pub markers: Vec<MapMarker>,
    pub viewport: MapViewport,
    pub selected: Option<String>,
}

impl<Message> canvas::Program<Message> for LiveMap {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb(0.03, 0.06, 0.08));

        let grid = Path::new(|builder| {
            for step in 1..4 {
                let x = bounds.width * step as f32 / 4.0;
                let y = bounds.height * step as f32 / 4.0;
                builder.move_to(Point::new(x, 0.0));
                builder.line_to(Point::new(x, bounds.height));
                builder.move_to(Point::new(0.0, y));
                builder.line_to(Point::new(bounds.width, y));
            }
        });
        frame.stroke(&grid, Stroke::default().with_color(GRID).with_width(1.0));

        let (lat, lng) = self.viewport.center();
        label(
            &mut frame,
            format!("{lat:.4}, {lng:.4}"),
            Point::new(6.0, bounds.height - 16.0),
            10.0,
        );

        for marker in &self.markers {
            let (x, y) = self
                .viewport
                .project(marker.lat, marker.lng, bounds.width, bounds.height);
            let center = Point::new(x, y);
            let selected = self.selected.as_deref() == Some(marker.trip_id.as_str());

            if selected {
                let ring = Path::circle(center, 13.0);
                frame.stroke(&ring, Stroke::default().with_color(Color::WHITE).with_width(2.0));
            }
            frame.fill(&Path::circle(center, 9.0), rgb(marker.color));
            frame.fill_text(canvas::Text {
                content: marker.glyph.to_string(),
                position: Point::new(x - 3.5, y - 6.5),
                color: Color::BLACK,
                size: Pixels(11.0),
                ..canvas::Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}
