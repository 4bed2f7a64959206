use crate::model::{TrackedEntity, TransportMode};

/// Centre of the default map region (Thiruvananthapuram).
pub const DEFAULT_CENTER: (f64, f64) = (8.5241, 76.9366);
const DEFAULT_SPAN_DEG: f64 = 0.1;
const MIN_SPAN_DEG: f64 = 0.01;
const MARGIN_FRACTION: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_f32(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

pub fn marker_color(mode: TransportMode) -> Rgb {
    match mode {
        TransportMode::Walk => Rgb::new(0x4C, 0xAF, 0x50),
        TransportMode::Bicycle => Rgb::new(0x21, 0x96, 0xF3),
        TransportMode::Car => Rgb::new(0xFF, 0x98, 0x00),
        TransportMode::Bus => Rgb::new(0x9C, 0x27, 0xB0),
        TransportMode::Train => Rgb::new(0xF4, 0x43, 0x36),
        TransportMode::AutoRickshaw => Rgb::new(0xFF, 0xEB, 0x3B),
        _ => Rgb::new(0x75, 0x75, 0x75),
    }
}

/// One live trip on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub trip_id: String,
    pub lat: f64,
    pub lng: f64,
    pub color: Rgb,
    pub glyph: char,
    pub title: String,
    pub popup: Vec<String>,
}

impl MapMarker {
    pub fn from_entity(entity: &TrackedEntity) -> Self {
        let mode = entity.transport_mode.label();
        let glyph = mode
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?');
        let people = match entity.group_size {
            1 => "1 person".to_string(),
            n => format!("{n} people"),
        };
        let started = entity
            .started_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let place = entity
            .location
            .name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            trip_id: entity.trip_id.clone(),
            lat: entity.location.lat,
            lng: entity.location.lng,
            color: marker_color(entity.transport_mode),
            glyph,
            title: format!("Trip {}", entity.trip_id),
            popup: vec![
                format!("User: {}", entity.user_type),
                format!("Mode: {mode}"),
                format!("Purpose: {}", entity.trip_purpose),
                format!("Group: {people}"),
                format!("Started: {started}"),
                format!("Location: {place}"),
            ],
        }
    }
}

/// Lat/lng window mapped onto a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewport {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Default for MapViewport {
    fn default() -> Self {
        Self::centred(DEFAULT_CENTER, DEFAULT_SPAN_DEG)
    }
}

impl MapViewport {
    pub fn centred(center: (f64, f64), span: f64) -> Self {
        let half = span / 2.0;
        Self {
            min_lat: center.0 - half,
            max_lat: center.0 + half,
            min_lng: center.1 - half,
            max_lng: center.1 + half,
        }
    }

    /// Smallest window holding every marker plus a margin.
    pub fn fit(markers: &[MapMarker]) -> Self {
        let mut points = markers
            .iter()
            .filter(|m| m.lat.is_finite() && m.lng.is_finite());
        let Some(first) = points.next() else {
            return Self::default();
        };

        let mut view = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lng: first.lng,
            max_lng: first.lng,
        };
        for marker in points {
            view.min_lat = view.min_lat.min(marker.lat);
            view.max_lat = view.max_lat.max(marker.lat);
            view.min_lng = view.min_lng.min(marker.lng);
            view.max_lng = view.max_lng.max(marker.lng);
        }

        let lat_pad = ((view.max_lat - view.min_lat) * MARGIN_FRACTION).max(MIN_SPAN_DEG / 2.0);
        let lng_pad = ((view.max_lng - view.min_lng) * MARGIN_FRACTION).max(MIN_SPAN_DEG / 2.0);
        view.min_lat -= lat_pad;
        view.max_lat += lat_pad;
        view.min_lng -= lng_pad;
        view.max_lng += lng_pad;
        view
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Canvas coordinates of `(lat, lng)`; north is up.
    pub fn project(&self, lat: f64, lng: f64, width: f32, height: f32) -> (f32, f32) {
        let lng_span = (self.max_lng - self.min_lng).max(f64::EPSILON);
        let lat_span = (self.max_lat - self.min_lat).max(f64::EPSILON);
        let x = (lng - self.min_lng) / lng_span * width as f64;
        let y = (self.max_lat - lat) / lat_span * height as f64;
        (x as f32, y as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;

    #[test]
    fn empty_map_uses_default_region() {
        let view = MapViewport::fit(&[]);
        let (lat, lng) = view.center();
        assert!((lat - 8.5241).abs() < 1e-9);
        assert!((lng - 76.9366).abs() < 1e-9);
    }

    #[test]
    fn fit_contains_every_marker() {
        let markers: Vec<MapMarker> = [(8.48, 76.94), (8.56, 76.88), (9.93, 76.26)]
            .iter()
            .enumerate()
            .map(|(i, (lat, lng))| {
                MapMarker::from_entity(&TrackedEntity::new(
                    format!("t{i}"),
                    Position::new(*lat, *lng),
                    TransportMode::Bus,
                ))
            })
            .collect();
        let view = MapViewport::fit(&markers);
        for marker in &markers {
            let (x, y) = view.project(marker.lat, marker.lng, 400.0, 300.0);
            assert!((0.0..=400.0).contains(&x));
            assert!((0.0..=300.0).contains(&y));
        }
    }

    #[test]
    fn marker_describes_the_trip() {
        let mut entity = TrackedEntity::new(
            "trip-7",
            Position::named(8.5, 76.9, "Technopark"),
            TransportMode::AutoRickshaw,
        );
        entity.group_size = 3;
        let marker = MapMarker::from_entity(&entity);
        assert_eq!(marker.glyph, 'A');
        assert_eq!(marker.color, Rgb::new(0xFF, 0xEB, 0x3B));
        assert!(marker.popup.contains(&"Group: 3 people".to_string()));
        assert!(marker.popup.contains(&"Location: Technopark".to_string()));
        assert!(marker.popup.contains(&"Started: Unknown".to_string()));
    }

    #[test]
    fn unlisted_modes_are_grey() {
        assert_eq!(marker_color(TransportMode::Ferry), marker_color(TransportMode::Unknown));
        assert_eq!(marker_color(TransportMode::Unknown), Rgb::new(0x75, 0x75, 0x75));
        assert_ne!(marker_color(TransportMode::Walk), marker_color(TransportMode::Unknown));
    }
}
