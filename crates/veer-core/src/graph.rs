//! Road-graph abstraction consumed by the overlay pipeline.
//!
//! The host router owns the real graph; this trait is the narrow contract
//! the overlays need from it. Edge identifiers are dense non-negative
//! integers in `[0, edge_count)` and both ids and geometries are immutable
//! for the lifetime of the process.

use crate::geometry::{GeoPoint, Polyline};

pub type EdgeId = u32;
pub type NodeId = u32;

/// The two node positions an edge spans, used for the bounding-box prefilter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeEndpoints {
    pub base: GeoPoint,
    pub adjacent: GeoPoint,
}

/// Read-only view of the host router's road graph.
pub trait RoadGraph: Send + Sync {
    /// Number of edges; valid ids are `0..edge_count`.
    fn edge_count(&self) -> usize;

    /// Endpoint coordinates of an edge, `None` for an unknown id.
    fn edge_endpoints(&self, edge: EdgeId) -> Option<EdgeEndpoints>;

    /// Full way geometry of an edge (at least two points).
    fn edge_polyline(&self, edge: EdgeId) -> Option<Polyline>;

    /// Baseline traversal speed in km/h, `None` when the graph has no value.
    fn baseline_speed_kmh(&self, edge: EdgeId) -> Option<f64>;
}

#[derive(Debug, Clone)]
struct StoredEdge {
    polyline: Polyline,
    speed_kmh: Option<f64>,
}

/// A `Vec`-backed graph for tests and hosts with a materialized static graph.
#[derive(Debug, Default)]
pub struct VectorGraph {
    edges: Vec<StoredEdge>,
}

impl VectorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge and return its id. Polylines with fewer than two
    /// points are stored but never match; hosts are expected to feed full
    /// way geometries.
    pub fn push_edge(&mut self, polyline: Polyline, speed_kmh: Option<f64>) -> EdgeId {
        let id = self.edges.len() as EdgeId;
        self.edges.push(StoredEdge { polyline, speed_kmh });
        id
    }
}

impl RoadGraph for VectorGraph {
    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge_endpoints(&self, edge: EdgeId) -> Option<EdgeEndpoints> {
        let stored = self.edges.get(edge as usize)?;
        Some(EdgeEndpoints {
            base: stored.polyline.first()?,
            adjacent: stored.polyline.last()?,
        })
    }

    fn edge_polyline(&self, edge: EdgeId) -> Option<Polyline> {
        self.edges.get(edge as usize).map(|e| e.polyline.clone())
    }

    fn baseline_speed_kmh(&self, edge: EdgeId) -> Option<f64> {
        self.edges.get(edge as usize)?.speed_kmh
    }
}
