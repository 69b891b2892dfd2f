//! Degree-space geometry used to match feed corridors against graph edges.
//!
//! All distances are computed in lon/lat degrees and converted with the flat
//! 111 000 m/degree factor. That is a latitude-only approximation; the
//! matching tolerances absorb the error at the latitudes this runs at.

use serde::{Deserialize, Serialize};

use crate::graph::EdgeEndpoints;

/// Flat conversion factor between degrees and meters.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Minimum bounding-box buffer applied before candidate filtering.
const MIN_MATCH_BUFFER_DEG: f64 = 0.001;

const CIRCLE_VERTICES: usize = 32;

/// A WGS-84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Straight-line distance to another point, in degrees.
    pub fn distance_deg(&self, other: &GeoPoint) -> f64 {
        let dlat = self.lat - other.lat;
        let dlon = self.lon - other.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

pub fn deg_to_meters(deg: f64) -> f64 {
    deg * METERS_PER_DEGREE
}

pub fn meters_to_deg(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// An ordered sequence of positions (a corridor or an edge geometry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<GeoPoint>,
}

impl Polyline {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// Convenience constructor from `(lat, lon)` pairs.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(
            coords
                .iter()
                .map(|&(lat, lon)| GeoPoint::new(lat, lon))
                .collect(),
        )
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<GeoPoint> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<GeoPoint> {
        self.points.last().copied()
    }

    /// A copy with the point order reversed.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    /// Total length in degrees, summed over segments.
    pub fn length_deg(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_deg(&pair[1]))
            .sum()
    }

    /// Normalized end-to-end direction `(dlon, dlat)`.
    ///
    /// `None` when the line has fewer than two points or zero extent, which
    /// scoring treats as a neutral direction.
    pub fn direction_vector(&self) -> Option<(f64, f64)> {
        if self.points.len() < 2 {
            return None;
        }
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        let dx = last.lon - first.lon;
        let dy = last.lat - first.lat;
        let length = (dx * dx + dy * dy).sqrt();
        if length == 0.0 {
            return None;
        }
        Some((dx / length, dy / length))
    }

    fn segments(&self) -> Vec<(GeoPoint, GeoPoint)> {
        if self.points.len() < 2 {
            return self.points.first().map(|p| (*p, *p)).into_iter().collect();
        }
        self.points.windows(2).map(|pair| (pair[0], pair[1])).collect()
    }

    /// Minimum distance between this line and another, in degrees.
    ///
    /// Zero when any segment pair intersects. This is the symmetric distance
    /// the match score feeds through the meter conversion.
    pub fn min_distance_deg(&self, other: &Polyline) -> f64 {
        let own = self.segments();
        let theirs = other.segments();
        let mut best = f64::INFINITY;
        for &(a1, a2) in &own {
            for &(b1, b2) in &theirs {
                let distance = segment_distance_deg(a1, a2, b1, b2);
                if distance < best {
                    best = distance;
                    if best == 0.0 {
                        return 0.0;
                    }
                }
            }
        }
        best
    }

    /// Nearest approach from a point to any vertex of this line, in degrees.
    pub fn min_vertex_distance_deg(&self, point: GeoPoint) -> f64 {
        self.points
            .iter()
            .map(|p| p.distance_deg(&point))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::of(self)
    }
}

/// Absolute cosine of the angle between the end-to-end vectors of two lines.
///
/// Road segments digitized in either direction are equivalent, hence the
/// absolute value. Degenerate lines score a neutral 0.5.
pub fn direction_alignment(a: &Polyline, b: &Polyline) -> f64 {
    match (a.direction_vector(), b.direction_vector()) {
        (Some(va), Some(vb)) => (va.0 * vb.0 + va.1 * vb.1).abs(),
        _ => 0.5,
    }
}

/// Axis-aligned lat/lon box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn of(line: &Polyline) -> Self {
        let mut bbox = Self {
            min_lat: f64::INFINITY,
            min_lon: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            max_lon: f64::NEG_INFINITY,
        };
        for point in line.points() {
            bbox.min_lat = bbox.min_lat.min(point.lat);
            bbox.max_lat = bbox.max_lat.max(point.lat);
            bbox.min_lon = bbox.min_lon.min(point.lon);
            bbox.max_lon = bbox.max_lon.max(point.lon);
        }
        bbox
    }

    pub fn around(center: GeoPoint, radius_deg: f64) -> Self {
        Self {
            min_lat: center.lat - radius_deg,
            min_lon: center.lon - radius_deg,
            max_lat: center.lat + radius_deg,
            max_lon: center.lon + radius_deg,
        }
    }

    /// Expand each axis by the larger of 0.001 degrees and 10% of its extent.
    pub fn expanded_for_matching(&self) -> Self {
        let lat_buffer = ((self.max_lat - self.min_lat) * 0.1).max(MIN_MATCH_BUFFER_DEG);
        let lon_buffer = ((self.max_lon - self.min_lon) * 0.1).max(MIN_MATCH_BUFFER_DEG);
        Self {
            min_lat: self.min_lat - lat_buffer,
            min_lon: self.min_lon - lon_buffer,
            max_lat: self.max_lat + lat_buffer,
            max_lon: self.max_lon + lon_buffer,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lon >= self.min_lon
            && point.lon <= self.max_lon
    }

    /// Candidate filter for an edge: either endpoint inside the box, or the
    /// endpoint pair straddles the box in both axes.
    pub fn admits_edge(&self, endpoints: &EdgeEndpoints) -> bool {
        if self.contains(endpoints.base) || self.contains(endpoints.adjacent) {
            return true;
        }
        let lat_lo = endpoints.base.lat.min(endpoints.adjacent.lat);
        let lat_hi = endpoints.base.lat.max(endpoints.adjacent.lat);
        let lon_lo = endpoints.base.lon.min(endpoints.adjacent.lon);
        let lon_hi = endpoints.base.lon.max(endpoints.adjacent.lon);
        lat_lo <= self.max_lat && lat_hi >= self.min_lat && lon_lo <= self.max_lon && lon_hi >= self.min_lon
    }
}

/// A 32-vertex polygon approximating a geodesic circle.
#[derive(Debug, Clone)]
pub struct CirclePolygon {
    center: GeoPoint,
    radius_deg: f64,
    ring: Vec<GeoPoint>,
}

impl CirclePolygon {
    pub fn approximate(center: GeoPoint, radius_m: f64) -> Self {
        let radius_deg = meters_to_deg(radius_m);
        let ring = (0..CIRCLE_VERTICES)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / CIRCLE_VERTICES as f64;
                GeoPoint::new(
                    center.lat + radius_deg * theta.sin(),
                    center.lon + radius_deg * theta.cos(),
                )
            })
            .collect();
        Self {
            center,
            radius_deg,
            ring,
        }
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.center, self.radius_deg)
    }

    /// Ray-cast point-in-polygon over the ring.
    pub fn contains(&self, point: GeoPoint) -> bool {
        let mut inside = false;
        let n = self.ring.len();
        let mut j = n - 1;
        for i in 0..n {
            let a = self.ring[i];
            let b = self.ring[j];
            if (a.lat > point.lat) != (b.lat > point.lat) {
                let slope_lon = (b.lon - a.lon) * (point.lat - a.lat) / (b.lat - a.lat) + a.lon;
                if point.lon < slope_lon {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn intersects_segment(&self, a: GeoPoint, b: GeoPoint) -> bool {
        if self.contains(a) || self.contains(b) {
            return true;
        }
        let n = self.ring.len();
        for i in 0..n {
            let e1 = self.ring[i];
            let e2 = self.ring[(i + 1) % n];
            if segments_intersect(a, b, e1, e2) {
                return true;
            }
        }
        false
    }
}

/// Minimum distance between two segments in degrees; zero when they cross.
pub fn segment_distance_deg(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> f64 {
    if segments_intersect(a1, a2, b1, b2) {
        return 0.0;
    }
    point_segment_distance_deg(a1, b1, b2)
        .min(point_segment_distance_deg(a2, b1, b2))
        .min(point_segment_distance_deg(b1, a1, a2))
        .min(point_segment_distance_deg(b2, a1, a2))
}

/// Distance from a point to the closest point of a segment, in degrees.
pub fn point_segment_distance_deg(p: GeoPoint, a: GeoPoint, b: GeoPoint) -> f64 {
    let px = p.lon - a.lon;
    let py = p.lat - a.lat;
    let sx = b.lon - a.lon;
    let sy = b.lat - a.lat;
    let len_sq = sx * sx + sy * sy;
    if len_sq <= f64::EPSILON {
        return (px * px + py * py).sqrt();
    }
    let t = ((px * sx + py * sy) / len_sq).clamp(0.0, 1.0);
    let dx = px - t * sx;
    let dy = py - t * sy;
    (dx * dx + dy * dy).sqrt()
}

fn orientation(a: GeoPoint, b: GeoPoint, c: GeoPoint) -> f64 {
    (b.lon - a.lon) * (c.lat - a.lat) - (b.lat - a.lat) * (c.lon - a.lon)
}

fn within_span(a: GeoPoint, b: GeoPoint, p: GeoPoint) -> bool {
    p.lon >= a.lon.min(b.lon)
        && p.lon <= a.lon.max(b.lon)
        && p.lat >= a.lat.min(b.lat)
        && p.lat <= a.lat.max(b.lat)
}

/// Segment intersection test covering proper crossings and collinear overlap.
pub fn segments_intersect(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && within_span(b1, b2, a1))
        || (d2 == 0.0 && within_span(b1, b2, a2))
        || (d3 == 0.0 && within_span(a1, a2, b1))
        || (d4 == 0.0 && within_span(a1, a2, b2))
}
