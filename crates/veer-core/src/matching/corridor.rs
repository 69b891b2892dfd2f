//! Line-to-edge matching for EDS and speed-limit corridors.

use std::sync::Arc;

use crate::geometry::{deg_to_meters, direction_alignment, Polyline};
use crate::graph::EdgeId;
use crate::matching::{sort_matches, EdgeGeometryCache, EdgeMatch, MatchParams};

/// Matches feed line strings against graph edges.
pub struct CorridorMatcher {
    cache: Arc<EdgeGeometryCache>,
}

impl CorridorMatcher {
    pub fn new(cache: Arc<EdgeGeometryCache>) -> Self {
        Self { cache }
    }

    /// All edges matching the corridor at or above the score floor,
    /// best match first.
    pub fn matches(&self, corridor: &Polyline, params: &MatchParams) -> Vec<EdgeMatch> {
        let mut matches = Vec::new();
        if corridor.len() < 2 {
            tracing::debug!(points = corridor.len(), "corridor too short to match");
            return matches;
        }

        let bounds = corridor.bounding_box().expanded_for_matching();
        let graph = self.cache.graph();
        for edge in 0..graph.edge_count() as EdgeId {
            let Some(endpoints) = graph.edge_endpoints(edge) else {
                tracing::debug!(edge, "edge has no endpoints, skipping");
                continue;
            };
            if !bounds.admits_edge(&endpoints) {
                continue;
            }
            let Some(geometry) = self.cache.geometry(edge) else {
                continue;
            };
            let score = match_score(corridor, &geometry, params.max_distance_m);
            if score >= params.min_score {
                matches.push(EdgeMatch { edge, score });
            }
        }

        sort_matches(&mut matches);
        matches
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// Combined match score in `[0, 1]`.
///
/// 0.4 · distance + 0.3 · length ratio + 0.3 · undirected direction
/// alignment; zero as soon as the nearest approach exceeds
/// `max_distance_m`.
pub fn match_score(corridor: &Polyline, edge: &Polyline, max_distance_m: f64) -> f64 {
    let distance_m = deg_to_meters(corridor.min_distance_deg(edge));
    if distance_m > max_distance_m {
        return 0.0;
    }
    let distance_score = (1.0 - distance_m / max_distance_m).max(0.0);

    let corridor_length = corridor.length_deg();
    let edge_length = edge.length_deg();
    let longest = corridor_length.max(edge_length);
    let length_ratio = if longest > 0.0 {
        corridor_length.min(edge_length) / longest
    } else {
        0.0
    };

    let direction_score = direction_alignment(corridor, edge);

    (0.4 * distance_score + 0.3 * length_ratio + 0.3 * direction_score).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RoadGraph, VectorGraph};

    fn matcher_for(graph: VectorGraph) -> CorridorMatcher {
        let graph: Arc<dyn RoadGraph> = Arc::new(graph);
        CorridorMatcher::new(Arc::new(EdgeGeometryCache::new(graph)))
    }

    fn street_grid() -> (VectorGraph, Polyline) {
        let mut graph = VectorGraph::new();
        // Edge 0 sits exactly on the corridor, edge 1 is a parallel street
        // ~110 m away, edge 2 is far outside the bounding box.
        let corridor = Polyline::from_coords(&[(37.90, 32.50), (37.91, 32.50)]);
        graph.push_edge(corridor.clone(), Some(50.0));
        graph.push_edge(
            Polyline::from_coords(&[(37.90, 32.501), (37.91, 32.501)]),
            Some(50.0),
        );
        graph.push_edge(
            Polyline::from_coords(&[(38.90, 33.50), (38.91, 33.50)]),
            Some(50.0),
        );
        (graph, corridor)
    }

    #[test]
    fn exact_geometry_scores_one() {
        let (graph, corridor) = street_grid();
        let matcher = matcher_for(graph);
        let matches = matcher.matches(&corridor, &MatchParams::eds());
        assert_eq!(matches.first().map(|m| m.edge), Some(0));
        assert!((matches[0].score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distant_parallel_street_is_rejected() {
        let (graph, corridor) = street_grid();
        let matcher = matcher_for(graph);
        let matches = matcher.matches(&corridor, &MatchParams::eds());
        assert!(matches.iter().all(|m| m.edge != 1), "111 m offset exceeds the 50 m gate");
        assert!(matches.iter().all(|m| m.edge != 2));
    }

    #[test]
    fn reversed_corridor_matches_the_same_edges() {
        let (graph, corridor) = street_grid();
        let matcher = matcher_for(graph);
        let forward: Vec<EdgeId> = matcher
            .matches(&corridor, &MatchParams::eds())
            .iter()
            .map(|m| m.edge)
            .collect();
        let backward: Vec<EdgeId> = matcher
            .matches(&corridor.reversed(), &MatchParams::eds())
            .iter()
            .map(|m| m.edge)
            .collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn matches_are_sorted_best_first() {
        let mut graph = VectorGraph::new();
        let corridor = Polyline::from_coords(&[(37.90, 32.50), (37.91, 32.50)]);
        // Same street, one edge with a slight lateral offset (~11 m).
        graph.push_edge(
            Polyline::from_coords(&[(37.90, 32.5001), (37.91, 32.5001)]),
            Some(50.0),
        );
        graph.push_edge(corridor.clone(), Some(50.0));
        let matcher = matcher_for(graph);
        let matches = matcher.matches(&corridor, &MatchParams::eds());
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].edge, 1);
        assert!(matches[0].score > matches[1].score);
    }

    #[test]
    fn speed_limit_params_are_stricter() {
        let mut graph = VectorGraph::new();
        let corridor = Polyline::from_coords(&[(37.90, 32.50), (37.91, 32.50)]);
        // ~39 m offset: inside the EDS distance gate, outside the
        // speed-limit one.
        graph.push_edge(
            Polyline::from_coords(&[(37.90, 32.50035), (37.91, 32.50035)]),
            Some(50.0),
        );
        let matcher = matcher_for(graph);
        assert_eq!(matcher.matches(&corridor, &MatchParams::eds()).len(), 1);
        assert!(matcher.matches(&corridor, &MatchParams::speed_limit()).is_empty());
    }

    #[test]
    fn geometry_cache_fills_once_and_clears_on_request() {
        let (graph, corridor) = street_grid();
        let matcher = matcher_for(graph);
        matcher.matches(&corridor, &MatchParams::eds());
        let after_first = matcher.cache_len();
        assert!(after_first > 0);
        matcher.matches(&corridor, &MatchParams::eds());
        assert_eq!(matcher.cache_len(), after_first);
        matcher.clear_cache();
        assert_eq!(matcher.cache_len(), 0);
    }

    #[test]
    fn below_threshold_scores_are_dropped() {
        let mut graph = VectorGraph::new();
        let corridor = Polyline::from_coords(&[(37.90, 32.50), (37.91, 32.50)]);
        // ~15 m offset and a tenth of the length: inside the distance gate
        // but the combined score stays under the floor.
        let stub = Polyline::from_coords(&[(37.90, 32.500135), (37.901, 32.500135)]);
        graph.push_edge(stub.clone(), Some(50.0));
        let matcher = matcher_for(graph);
        let matches = matcher.matches(&corridor, &MatchParams::speed_limit());
        assert!(matches.is_empty());
        let score = match_score(&corridor, &stub, 30.0);
        assert!(score < 0.7, "score {score} should stay under the floor");
    }
}
