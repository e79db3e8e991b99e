//! Geographic helpers.
//!
//! Great-circle distance, a local equirectangular projection for planar work
//! over short distances, and point-to-segment projection in that plane.

use serde::{Deserialize, Serialize};

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two coordinates, in metres.
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Sum of great-circle distances between consecutive coordinates.
pub fn path_length_m(points: &[LatLng]) -> f64 {
    points.windows(2).map(|w| haversine_m(w[0], w[1])).sum()
}

/// A point in a local planar frame, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Point) -> f64 {
        self.distance_sq(other).sqrt()
    }
}

/// Equirectangular projection around a reference coordinate.
///
/// Accurate to well under a metre across a campus-sized network, which is all
/// the ETA projection needs.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin: LatLng,
    cos_lat: f64,
}

impl LocalProjection {
    pub fn new(origin: LatLng) -> Self {
        Self {
            origin,
            cos_lat: origin.lat.to_radians().cos(),
        }
    }

    pub fn project(&self, p: LatLng) -> Point {
        Point {
            x: EARTH_RADIUS_M * (p.lng - self.origin.lng).to_radians() * self.cos_lat,
            y: EARTH_RADIUS_M * (p.lat - self.origin.lat).to_radians(),
        }
    }
}

/// Result of projecting a point onto a line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Position along the segment, clamped to `[0, 1]`.
    pub t: f64,
    /// The closest point on the segment.
    pub point: Point,
    /// Squared distance from the query point to `point`.
    pub distance_sq: f64,
}

/// Project `p` onto the segment `a`–`b`.
///
/// A degenerate segment projects everything onto `a`.
pub fn project_onto_segment(p: Point, a: Point, b: Point) -> SegmentProjection {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;

    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0)
    };

    let point = Point {
        x: a.x + t * abx,
        y: a.y + t * aby,
    };

    SegmentProjection {
        t,
        point,
        distance_sq: p.distance_sq(point),
    }
}

/// Offset a coordinate by a number of metres north and east.
///
/// Inverse of [`LocalProjection::project`]; mostly useful for building
/// fixtures with known distances.
pub fn offset_m(origin: LatLng, north_m: f64, east_m: f64) -> LatLng {
    let d_lat = (north_m / EARTH_RADIUS_M).to_degrees();
    let d_lng = (east_m / (EARTH_RADIUS_M * origin.lat.to_radians().cos())).to_degrees();
    LatLng::new(origin.lat + d_lat, origin.lng + d_lng)
}
