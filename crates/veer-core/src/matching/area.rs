//! Circle-to-edge matching for custom avoidance areas.

use std::sync::Arc;

use crate::geometry::{deg_to_meters, CirclePolygon, GeoPoint};
use crate::graph::EdgeId;
use crate::matching::{sort_matches, EdgeGeometryCache, EdgeMatch};

/// Matches circular areas (center + radius) against graph edges.
pub struct AreaMatcher {
    cache: Arc<EdgeGeometryCache>,
}

impl AreaMatcher {
    pub fn new(cache: Arc<EdgeGeometryCache>) -> Self {
        Self { cache }
    }

    /// Edges whose geometry intersects the circle, scored by how close they
    /// come to its center. Intersection is the only gate; areas have no
    /// score threshold.
    pub fn matches(&self, center: GeoPoint, radius_m: f64) -> Vec<EdgeMatch> {
        let mut matches = Vec::new();
        if radius_m <= 0.0 {
            tracing::debug!(radius_m, "non-positive area radius, nothing to match");
            return matches;
        }

        let circle = CirclePolygon::approximate(center, radius_m);
        let bounds = circle.bounding_box().expanded_for_matching();
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

            let intersects = geometry
                .points()
                .windows(2)
                .any(|pair| circle.intersects_segment(pair[0], pair[1]));
            if !intersects {
                continue;
            }

            let min_distance_m = deg_to_meters(geometry.min_vertex_distance_deg(center));
            let score = ((radius_m - min_distance_m) / radius_m).max(0.0);
            matches.push(EdgeMatch { edge, score });
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
