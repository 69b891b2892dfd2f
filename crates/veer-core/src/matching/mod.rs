//! Geometry matchers that map feed corridors and areas to graph edges.

mod area;
mod corridor;

pub use area::AreaMatcher;
pub use corridor::{match_score, CorridorMatcher};

use std::sync::Arc;

use dashmap::DashMap;

use crate::geometry::Polyline;
use crate::graph::{EdgeId, RoadGraph};

/// A scored correspondence between a feed geometry and a graph edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeMatch {
    pub edge: EdgeId,
    pub score: f64,
}

/// Feed-specific matching tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchParams {
    /// Matches farther than this are rejected outright.
    pub max_distance_m: f64,
    /// Minimum combined score for an accepted match.
    pub min_score: f64,
}

impl MatchParams {
    /// EDS corridors: generous distance, moderate score floor.
    pub fn eds() -> Self {
        Self {
            max_distance_m: 50.0,
            min_score: 0.6,
        }
    }

    /// Speed-limit corridors must sit tighter on the road they describe.
    pub fn speed_limit() -> Self {
        Self {
            max_distance_m: 30.0,
            min_score: 0.7,
        }
    }
}

/// Shared edge-geometry cache with at-most-once construction per edge.
///
/// Reconstructing a polyline from graph internals is the expensive part of
/// matching; the cache survives refreshes and is only dropped on request.
pub struct EdgeGeometryCache {
    graph: Arc<dyn RoadGraph>,
    lines: DashMap<EdgeId, Arc<Polyline>>,
}

impl EdgeGeometryCache {
    pub fn new(graph: Arc<dyn RoadGraph>) -> Self {
        Self {
            graph,
            lines: DashMap::new(),
        }
    }

    pub fn graph(&self) -> &Arc<dyn RoadGraph> {
        &self.graph
    }

    /// The cached geometry of an edge, fetching and caching it on first use.
    ///
    /// Edges without usable geometry (unknown id, fewer than two points)
    /// yield `None` and are treated as non-matches by the callers.
    pub fn geometry(&self, edge: EdgeId) -> Option<Arc<Polyline>> {
        if let Some(hit) = self.lines.get(&edge) {
            return Some(hit.value().clone());
        }
        let line = self.graph.edge_polyline(edge)?;
        if line.len() < 2 {
            tracing::debug!(edge, points = line.len(), "edge has insufficient geometry");
            return None;
        }
        let entry = self.lines.entry(edge).or_insert_with(|| Arc::new(line));
        Some(entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&self) {
        self.lines.clear();
        tracing::debug!("cleared edge geometry cache");
    }
}

pub(crate) fn sort_matches(matches: &mut Vec<EdgeMatch>) {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.edge.cmp(&b.edge))
    });
}
