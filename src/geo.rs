//! Coordinates, great-circle distance and the map camera.
//!
//! [`GeoPoint`] is the value every other module passes around. [`Viewport`]
//! is what the map canvas in [`ui`](crate::ui) turns into x/y bounds.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle surface distance between two points, in kilometers.
///
/// Haversine formula on a sphere of radius [`EARTH_RADIUS_KM`], rounded to
/// two decimal places. Out-of-range coordinates are not checked.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round2(EARTH_RADIUS_KM * c)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Axis-aligned box around a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box containing every point. `None` for an empty slice.
    pub fn around(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds {
            south: first.latitude,
            west: first.longitude,
            north: first.latitude,
            east: first.longitude,
        };
        for p in &points[1..] {
            bounds.south = bounds.south.min(p.latitude);
            bounds.north = bounds.north.max(p.latitude);
            bounds.west = bounds.west.min(p.longitude);
            bounds.east = bounds.east.max(p.longitude);
        }
        Some(bounds)
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.south..=self.north).contains(&p.latitude) && (self.west..=self.east).contains(&p.longitude)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}

/// The visible window of the map canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: GeoPoint,
    /// Visible width in degrees of longitude.
    pub lon_span: f64,
    /// Visible height in degrees of latitude.
    pub lat_span: f64,
}

// Keeps a fitted view from collapsing onto a single braille cell.
const MIN_SPAN: f64 = 0.5;

impl Default for Viewport {
    fn default() -> Self {
        Self::world()
    }
}

impl Viewport {
    pub fn world() -> Self {
        Self {
            center: GeoPoint::new(0.0, 0.0),
            lon_span: 360.0,
            lat_span: 180.0,
        }
    }

    /// Camera centered on `center`; every zoom step halves the visible span.
    pub fn centered(center: GeoPoint, zoom: f64) -> Self {
        let lon_span = (360.0 / 2f64.powf(zoom.max(0.0))).max(MIN_SPAN);
        Self {
            center,
            lon_span,
            lat_span: (lon_span / 2.0).max(MIN_SPAN),
        }
    }

    /// Camera framing `bounds`, grown by `padding` (a fraction of the span) on every side.
    pub fn fit(bounds: Bounds, padding: f64) -> Self {
        let pad = 1.0 + 2.0 * padding.max(0.0);
        Self {
            center: bounds.center(),
            lon_span: ((bounds.east - bounds.west) * pad).clamp(MIN_SPAN, 360.0),
            lat_span: ((bounds.north - bounds.south) * pad).clamp(MIN_SPAN, 180.0),
        }
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        let half = self.lon_span / 2.0;
        [self.center.longitude - half, self.center.longitude + half]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        let half = self.lat_span / 2.0;
        [self.center.latitude - half, self.center.latitude + half]
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        let [west, east] = self.x_bounds();
        let [south, north] = self.y_bounds();
        (west..=east).contains(&p.longitude) && (south..=north).contains(&p.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(distance_km(london, paris), distance_km(paris, london));
        assert!((distance_km(london, paris) - 343.56).abs() < 0.01);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(37.7749, -122.4194);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn quarter_great_circle() {
        let d = distance_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 90.0));
        assert!((d - 10007.54).abs() < 0.005, "got {d}");
    }

    #[test]
    fn distance_is_rounded_to_two_places() {
        let d = distance_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(10.0, 10.0));
        assert_eq!(d, 1568.52);
    }

    #[test]
    fn fitted_viewport_contains_both_points() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(10.0, 10.0);
        let bounds = Bounds::around(&[a, b]).unwrap();
        let view = Viewport::fit(bounds, 0.25);
        assert!(view.contains(a));
        assert!(view.contains(b));
        assert_eq!(view.center, GeoPoint::new(5.0, 5.0));
        assert_eq!(view.lon_span, 15.0);
    }

    #[test]
    fn zoom_halves_span() {
        let p = GeoPoint::new(10.0, 20.0);
        assert_eq!(Viewport::centered(p, 0.0).lon_span, 360.0);
        assert_eq!(Viewport::centered(p, 2.0).lon_span, 90.0);
        assert_eq!(Viewport::centered(p, 2.0).lat_span, 45.0);
        assert_eq!(Viewport::centered(p, 2.0).x_bounds(), [-25.0, 65.0]);
    }

    #[test]
    fn bounds_around_empty_is_none() {
        assert!(Bounds::around(&[]).is_none());
    }
}
