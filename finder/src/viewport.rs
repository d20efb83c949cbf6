use crate::model::LatLon;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Web Mercator cuts off here.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_6;
const TILE_SIZE: f64 = 256.0;

/// A lat/lon rectangle. When `west > east` the box crosses the antimeridian.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Bounds { south, west, north, east }
    }

    /// The whole world.
    pub fn world() -> Self {
        Bounds::new(-90.0, -180.0, 90.0, 180.0)
    }

    pub fn point(p: LatLon) -> Self {
        Bounds::new(p.lat, p.lon, p.lat, p.lon)
    }

    pub fn is_finite(&self) -> bool {
        self.south.is_finite() && self.west.is_finite() && self.north.is_finite() && self.east.is_finite()
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, p: LatLon) -> bool {
        if p.lat < self.south || p.lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            p.lon >= self.west || p.lon <= self.east
        } else {
            p.lon >= self.west && p.lon <= self.east
        }
    }

    pub fn extend(&mut self, p: LatLon) {
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self.west = self.west.min(p.lon);
        self.east = self.east.max(p.lon);
    }

    pub fn from_points<I: IntoIterator<Item = LatLon>>(points: I) -> Option<Bounds> {
        let mut it = points.into_iter();
        let mut b = Bounds::point(it.next()?);
        for p in it {
            b.extend(p);
        }
        Some(b)
    }

    pub fn center(&self) -> LatLon {
        let mut lon = if self.crosses_antimeridian() {
            (self.west + self.east + 360.0) / 2.0
        } else {
            (self.west + self.east) / 2.0
        };
        if lon > 180.0 {
            lon -= 360.0;
        }
        LatLon::new((self.south + self.north) / 2.0, lon)
    }
}

/// Strategy that widens the visible bounds before the viewport filter runs.
/// The map clusterer counts markers slightly off-screen as visible when they
/// belong to an on-screen cluster; implementations reproduce that padding.
pub trait BoundsPadding {
    fn extend(&self, bounds: &Bounds, zoom: u8) -> Bounds;
}

/// Use the bounds as reported by the map.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPadding;

impl BoundsPadding for NoPadding {
    fn extend(&self, bounds: &Bounds, _zoom: u8) -> Bounds {
        *bounds
    }
}

/// Pads every side by a fixed number of screen pixels at the current zoom.
#[derive(Clone, Copy, Debug)]
pub struct GridPadding {
    pub grid_size_px: f64,
}

impl GridPadding {
    pub fn new(grid_size_px: f64) -> Self {
        GridPadding { grid_size_px }
    }
}

fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * 2f64.powi(zoom as i32)
}

fn project(p: LatLon, world: f64) -> (f64, f64) {
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (p.lon + 180.0) / 360.0 * world;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
    (x, y)
}

fn unproject(x: f64, y: f64, world: f64) -> LatLon {
    let lon = x / world * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * y / world);
    let lat = n.sinh().atan().to_degrees();
    LatLon::new(lat, lon)
}

fn wrap_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

impl BoundsPadding for GridPadding {
    fn extend(&self, bounds: &Bounds, zoom: u8) -> Bounds {
        let world = world_size(zoom);
        let pad = self.grid_size_px.max(0.0);
        let (x_w, y_s) = project(LatLon::new(bounds.south, bounds.west), world);
        let (x_e, y_n) = project(LatLon::new(bounds.north, bounds.east), world);
        let mut width = x_e - x_w;
        if width < 0.0 {
            width += world;
        }
        let sw = unproject(x_w - pad, (y_s + pad).min(world), world);
        let ne = unproject(x_e + pad, (y_n - pad).max(0.0), world);
        let (west, east) = if width + 2.0 * pad >= world {
            (-180.0, 180.0)
        } else {
            (wrap_lon(sw.lon), wrap_lon(ne.lon))
        };
        Bounds::new(sw.lat, west, ne.lat, east)
    }
}

/// Current map view, as last reported by the map widget.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: Option<Bounds>,
    pub zoom: u8,
    pub filter_on: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { bounds: None, zoom: 0, filter_on: false }
    }
}

impl Viewport {
    /// Bounds the classifier should use, or `None` when the viewport filter
    /// is off or the map has not reported bounds yet.
    pub fn filter_bounds(&self, padding: &dyn BoundsPadding) -> Option<Bounds> {
        if !self.filter_on {
            return None;
        }
        self.bounds.map(|b| padding.extend(&b, self.zoom))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Trigger {
    /// Run the update right away.
    Now,
    /// An update is scheduled for this time (ms).
    Deferred(f64),
}

/// Coalesces bursts of pan/zoom events. The very first event fires at once
/// so the initial map load is not delayed; later ones restart a timer.
#[derive(Clone, Debug)]
pub struct Debouncer {
    delay_ms: f64,
    primed: bool,
    due: Option<f64>,
}

impl Debouncer {
    pub fn new(delay_ms: u32) -> Self {
        Debouncer { delay_ms: delay_ms as f64, primed: false, due: None }
    }

    pub fn trigger(&mut self, now_ms: f64) -> Trigger {
        if !self.primed {
            self.primed = true;
            self.due = None;
            return Trigger::Now;
        }
        let due = now_ms + self.delay_ms;
        self.due = Some(due);
        Trigger::Deferred(due)
    }

    /// True once when a deferred update becomes due.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.due {
            Some(due) if now_ms >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> Option<f64> {
        self.due
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_across_antimeridian() {
        let b = Bounds::new(-10.0, 170.0, 10.0, -170.0);
        assert!(b.contains(LatLon::new(0.0, 175.0)));
        assert!(b.contains(LatLon::new(0.0, -175.0)));
        assert!(!b.contains(LatLon::new(0.0, 0.0)));
        assert!(!b.contains(LatLon::new(20.0, 175.0)));
    }

    #[test]
    fn grid_padding_grows_bounds() {
        let b = Bounds::new(18.0, -73.0, 19.0, -72.0);
        let e = GridPadding::new(60.0).extend(&b, 8);
        assert!(e.south < b.south && e.north > b.north);
        assert!(e.west < b.west && e.east > b.east);
        // Padding shrinks in degrees as zoom grows.
        let e12 = GridPadding::new(60.0).extend(&b, 12);
        assert!(e12.west > e.west);
        assert_eq!(NoPadding.extend(&b, 8), b);
    }

    #[test]
    fn grid_padding_at_world_zoom_covers_all_longitudes() {
        let b = Bounds::new(-10.0, -100.0, 10.0, 100.0);
        let e = GridPadding::new(60.0).extend(&b, 0);
        assert_eq!((e.west, e.east), (-180.0, 180.0));
    }

    #[test]
    fn grid_padding_wraps_far_out_longitudes() {
        let b = Bounds::new(0.0, 1.0e20, 1.0, 0.0);
        let e = GridPadding::new(60.0).extend(&b, 5);
        assert!((-180.0..=180.0).contains(&e.west));
        assert!((-180.0..=180.0).contains(&e.east));
        assert_eq!(wrap_lon(190.0), -170.0);
        assert_eq!(wrap_lon(-540.0), -180.0);
        assert_eq!(wrap_lon(180.0), 180.0);
    }

    #[test]
    fn debouncer_first_immediate_then_coalesced() {
        let mut d = Debouncer::new(250);
        assert_eq!(d.trigger(0.0), Trigger::Now);
        assert_eq!(d.trigger(10.0), Trigger::Deferred(260.0));
        assert_eq!(d.trigger(100.0), Trigger::Deferred(350.0));
        assert!(!d.poll(300.0));
        assert!(d.poll(350.0));
        assert!(!d.poll(400.0));
    }

    #[test]
    fn filter_bounds_only_when_enabled() {
        let mut v = Viewport { bounds: Some(Bounds::world()), zoom: 3, filter_on: false };
        assert_eq!(v.filter_bounds(&NoPadding), None);
        v.filter_on = true;
        assert_eq!(v.filter_bounds(&NoPadding), Some(Bounds::world()));
    }
}
