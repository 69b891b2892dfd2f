//! The wrapping cost function that applies overlays to a base weighting.

use std::sync::Arc;

use crate::graph::{EdgeId, NodeId, RoadGraph};
use crate::overlay::{AreaTable, EdsTable, SpeedLimitTable};
use crate::vehicle::VehicleClass;

/// Uniform multiplier for edges on an active avoidance list.
///
/// Applied once per edge, never stacked, so an edge flagged by both EDS and
/// a custom area costs 10x - not 100x.
pub const AVOIDANCE_PENALTY_FACTOR: f64 = 10.0;

/// The cost-function contract of the host router.
///
/// All five operations are implementable by delegation to an underlying
/// base, which is exactly what the overlay wrapper does for everything it
/// does not perturb.
pub trait Weighting: Send + Sync {
    fn edge_weight(&self, edge: EdgeId, reverse: bool) -> f64;
    fn edge_millis(&self, edge: EdgeId, reverse: bool) -> u64;
    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64;
    fn turn_millis(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> u64;
    fn has_turn_costs(&self) -> bool;
    /// Lower bound used by the router's optimality checks. The overlay only
    /// ever multiplies by factors >= 0.85, and bonuses below 1.0 are capped,
    /// so delegating keeps the bound admissible.
    fn min_weight_per_distance(&self) -> f64;
    fn name(&self) -> String;
}

/// Per-request overlay selection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlayFlags {
    pub avoid_eds: bool,
    pub avoid_custom_areas: bool,
    pub vehicle_class: Option<VehicleClass>,
}

impl OverlayFlags {
    pub fn any_active(&self) -> bool {
        self.avoid_eds || self.avoid_custom_areas || self.vehicle_class.is_some()
    }

    pub fn avoidance_active(&self) -> bool {
        self.avoid_eds || self.avoid_custom_areas
    }
}

/// A weighting that overlays avoidance and speed-limit hints onto a base.
///
/// Table handles are captured at construction; the weighting is a pure
/// function of `(edge, reverse)` for the lifetime of one request, no matter
/// what the index installs meanwhile.
pub struct OverlayWeighting {
    base: Arc<dyn Weighting>,
    graph: Arc<dyn RoadGraph>,
    eds: Arc<EdsTable>,
    areas: Arc<AreaTable>,
    speed_limits: Option<Arc<SpeedLimitTable>>,
    flags: OverlayFlags,
}

impl OverlayWeighting {
    pub fn new(
        base: Arc<dyn Weighting>,
        graph: Arc<dyn RoadGraph>,
        eds: Arc<EdsTable>,
        areas: Arc<AreaTable>,
        speed_limits: Option<Arc<SpeedLimitTable>>,
        flags: OverlayFlags,
    ) -> Self {
        tracing::debug!(
            eds_edges = eds.len(),
            area_edges = areas.len(),
            speed_limit_edges = speed_limits.as_ref().map(|t| t.len()).unwrap_or(0),
            avoid_eds = flags.avoid_eds,
            avoid_custom_areas = flags.avoid_custom_areas,
            vehicle_class = ?flags.vehicle_class,
            "overlay weighting created"
        );
        Self {
            base,
            graph,
            eds,
            areas,
            speed_limits,
            flags,
        }
    }

    fn edge_in_range(&self, edge: EdgeId) -> bool {
        (edge as usize) < self.graph.edge_count()
    }

    fn avoidance_multiplier(&self, edge: EdgeId) -> f64 {
        if self.flags.avoid_eds && self.eds.contains(edge) {
            tracing::debug!(edge, "EDS avoidance penalty applied");
            return AVOIDANCE_PENALTY_FACTOR;
        }
        if self.flags.avoid_custom_areas && self.areas.contains(edge) {
            tracing::debug!(edge, "custom-area avoidance penalty applied");
            return AVOIDANCE_PENALTY_FACTOR;
        }
        1.0
    }

    fn speed_limit_multiplier(&self, edge: EdgeId) -> f64 {
        let Some(class) = self.flags.vehicle_class else {
            return 1.0;
        };
        let Some(table) = &self.speed_limits else {
            return 1.0;
        };
        let Some(entry) = table.get(edge) else {
            return 1.0;
        };
        if entry.limit_kmh == 0 {
            return 1.0;
        }

        let baseline = self
            .graph
            .baseline_speed_kmh(edge)
            .filter(|speed| *speed > 0.0)
            .unwrap_or_else(|| class.default_urban_speed_kmh());
        let limit = f64::from(entry.limit_kmh);

        if limit >= baseline {
            bonus_factor(limit - baseline)
        } else {
            penalty_factor(baseline - limit)
        }
    }
}

impl Weighting for OverlayWeighting {
    fn edge_weight(&self, edge: EdgeId, reverse: bool) -> f64 {
        let base = self.base.edge_weight(edge, reverse);
        if !self.edge_in_range(edge) {
            tracing::debug!(edge, "edge id out of range, base weight unchanged");
            return base;
        }

        let avoidance = self.avoidance_multiplier(edge);
        if avoidance > 1.0 {
            // Avoidance takes precedence; no speed-limit bonus can soften a
            // flagged edge.
            return base * avoidance;
        }
        base * self.speed_limit_multiplier(edge)
    }

    fn edge_millis(&self, edge: EdgeId, reverse: bool) -> u64 {
        self.base.edge_millis(edge, reverse)
    }

    fn turn_weight(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> f64 {
        self.base.turn_weight(in_edge, via_node, out_edge)
    }

    fn turn_millis(&self, in_edge: EdgeId, via_node: NodeId, out_edge: EdgeId) -> u64 {
        self.base.turn_millis(in_edge, via_node, out_edge)
    }

    fn has_turn_costs(&self) -> bool {
        self.base.has_turn_costs()
    }

    fn min_weight_per_distance(&self) -> f64 {
        self.base.min_weight_per_distance()
    }

    fn name(&self) -> String {
        format!("overlay_{}", self.base.name())
    }
}

/// Bonus multiplier when the corridor limit meets or exceeds the baseline.
pub fn bonus_factor(speed_difference_kmh: f64) -> f64 {
    if speed_difference_kmh <= 5.0 {
        0.97
    } else if speed_difference_kmh <= 15.0 {
        0.95
    } else if speed_difference_kmh <= 30.0 {
        0.92
    } else if speed_difference_kmh <= 50.0 {
        0.88
    } else {
        0.85
    }
}

/// Penalty multiplier when the corridor limit is below the baseline.
pub fn penalty_factor(speed_difference_kmh: f64) -> f64 {
    if speed_difference_kmh <= 5.0 {
        1.03
    } else if speed_difference_kmh <= 15.0 {
        1.08
    } else if speed_difference_kmh <= 30.0 {
        1.15
    } else if speed_difference_kmh <= 50.0 {
        1.25
    } else {
        1.35
    }
}

/// Hard-ban alternative to the soft 10x penalty.
///
/// Rejects flagged edges outright. Not used by the request binder - a hard
/// ban can disconnect the graph - but offered for hosts that prefer strict
/// exclusion over penalties.
pub struct AvoidanceEdgeFilter {
    eds: Arc<EdsTable>,
    areas: Arc<AreaTable>,
    avoid_eds: bool,
    avoid_custom_areas: bool,
}

impl AvoidanceEdgeFilter {
    pub fn new(
        eds: Arc<EdsTable>,
        areas: Arc<AreaTable>,
        avoid_eds: bool,
        avoid_custom_areas: bool,
    ) -> Self {
        Self {
            eds,
            areas,
            avoid_eds,
            avoid_custom_areas,
        }
    }

    pub fn accept(&self, edge: EdgeId) -> bool {
        if self.avoid_eds && self.eds.contains(edge) {
            return false;
        }
        if self.avoid_custom_areas && self.areas.contains(edge) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polyline;
    use crate::graph::VectorGraph;
    use crate::overlay::{AreaEntry, EdsEntry, SpeedLimitEntry};

    struct ConstantWeighting(f64);

    impl Weighting for ConstantWeighting {
        fn edge_weight(&self, _edge: EdgeId, _reverse: bool) -> f64 {
            self.0
        }

        fn edge_millis(&self, _edge: EdgeId, _reverse: bool) -> u64 {
            1_000
        }

        fn turn_weight(&self, _in: EdgeId, _via: NodeId, _out: EdgeId) -> f64 {
            0.5
        }

        fn turn_millis(&self, _in: EdgeId, _via: NodeId, _out: EdgeId) -> u64 {
            500
        }

        fn has_turn_costs(&self) -> bool {
            true
        }

        fn min_weight_per_distance(&self) -> f64 {
            0.01
        }

        fn name(&self) -> String {
            "constant".to_string()
        }
    }

    fn five_edge_graph(baseline_kmh: Option<f64>) -> Arc<dyn RoadGraph> {
        let mut graph = VectorGraph::new();
        for i in 0..5 {
            let lat = 37.9 + i as f64 * 0.01;
            graph.push_edge(
                Polyline::from_coords(&[(lat, 32.50), (lat, 32.51)]),
                baseline_kmh,
            );
        }
        Arc::new(graph)
    }

    struct Fixture {
        graph: Arc<dyn RoadGraph>,
        eds: Arc<EdsTable>,
        areas: Arc<AreaTable>,
        speed_limits: Arc<SpeedLimitTable>,
    }

    /// Edge 0: EDS. Edge 1: custom area. Edge 2: both. Edge 3: speed limit
    /// 70 km/h. Edge 4: clean.
    fn fixture(baseline_kmh: Option<f64>) -> Fixture {
        let mut eds = EdsTable::default();
        eds.insert_if_better(0, EdsEntry { match_score: 0.9 });
        eds.insert_if_better(2, EdsEntry { match_score: 0.8 });

        let mut areas = AreaTable::default();
        areas.insert_if_better(
            1,
            AreaEntry {
                match_score: 0.6,
                area_id: "works-17".to_string(),
            },
        );
        areas.insert_if_better(
            2,
            AreaEntry {
                match_score: 0.7,
                area_id: "works-17".to_string(),
            },
        );

        let mut speed_limits = SpeedLimitTable::default();
        speed_limits.insert_if_better(
            3,
            SpeedLimitEntry {
                limit_kmh: 70,
                corridor_title: "north avenue".to_string(),
                match_score: 0.85,
            },
        );

        Fixture {
            graph: five_edge_graph(baseline_kmh),
            eds: Arc::new(eds),
            areas: Arc::new(areas),
            speed_limits: Arc::new(speed_limits),
        }
    }

    fn weighting(fixture: &Fixture, flags: OverlayFlags) -> OverlayWeighting {
        OverlayWeighting::new(
            Arc::new(ConstantWeighting(100.0)),
            fixture.graph.clone(),
            fixture.eds.clone(),
            fixture.areas.clone(),
            flags
                .vehicle_class
                .is_some()
                .then(|| fixture.speed_limits.clone()),
            flags,
        )
    }

    #[test]
    fn no_flags_means_identity_everywhere() {
        let fixture = fixture(Some(50.0));
        let overlay = weighting(&fixture, OverlayFlags::default());
        for edge in 0..5 {
            assert_eq!(overlay.edge_weight(edge, false), 100.0);
            assert_eq!(overlay.edge_weight(edge, true), 100.0);
        }
    }

    #[test]
    fn avoidance_applies_ten_times_once() {
        let fixture = fixture(Some(50.0));
        let overlay = weighting(
            &fixture,
            OverlayFlags {
                avoid_eds: true,
                avoid_custom_areas: true,
                vehicle_class: None,
            },
        );
        assert_eq!(overlay.edge_weight(0, false), 1_000.0);
        assert_eq!(overlay.edge_weight(1, false), 1_000.0);
        // Flagged by both systems: still exactly one 10x, never 100x.
        assert_eq!(overlay.edge_weight(2, false), 1_000.0);
        assert_eq!(overlay.edge_weight(4, false), 100.0);
    }

    #[test]
    fn unflagged_overlay_ignores_table_contents() {
        let fixture = fixture(Some(50.0));
        let overlay = weighting(
            &fixture,
            OverlayFlags {
                avoid_eds: true,
                avoid_custom_areas: false,
                vehicle_class: None,
            },
        );
        // Edge 1 is only in the area table, and area avoidance is off.
        assert_eq!(overlay.edge_weight(1, false), 100.0);
    }

    #[test]
    fn speed_bonus_uses_the_banded_table() {
        let fixture = fixture(Some(50.0));
        let overlay = weighting(
            &fixture,
            OverlayFlags {
                avoid_eds: false,
                avoid_custom_areas: false,
                vehicle_class: Some(VehicleClass::Auto),
            },
        );
        // 70 km/h corridor over a 50 km/h baseline: 16-30 band, 0.92.
        assert!((overlay.edge_weight(3, false) - 92.0).abs() < 1e-9);
        assert_eq!(overlay.edge_weight(4, false), 100.0);
    }

    #[test]
    fn missing_baseline_falls_back_to_class_default() {
        let fixture = fixture(None);
        let overlay = weighting(
            &fixture,
            OverlayFlags {
                avoid_eds: false,
                avoid_custom_areas: false,
                vehicle_class: Some(VehicleClass::Truck),
            },
        );
        // Truck default 40, corridor 70: diff 30, bonus 0.92.
        assert!((overlay.edge_weight(3, false) - 92.0).abs() < 1e-9);
    }

    #[test]
    fn avoidance_suppresses_the_speed_bonus() {
        let fixture = fixture(Some(50.0));
        let mut eds = EdsTable::default();
        eds.insert_if_better(3, EdsEntry { match_score: 0.9 });
        let overlay = OverlayWeighting::new(
            Arc::new(ConstantWeighting(100.0)),
            fixture.graph.clone(),
            Arc::new(eds),
            fixture.areas.clone(),
            Some(fixture.speed_limits.clone()),
            OverlayFlags {
                avoid_eds: true,
                avoid_custom_areas: false,
                vehicle_class: Some(VehicleClass::Auto),
            },
        );
        // Edge 3 has both an EDS flag and a bonus corridor: avoidance wins.
        assert_eq!(overlay.edge_weight(3, false), 1_000.0);
    }

    #[test]
    fn out_of_range_edge_returns_base_weight() {
        let fixture = fixture(Some(50.0));
        let overlay = weighting(
            &fixture,
            OverlayFlags {
                avoid_eds: true,
                avoid_custom_areas: true,
                vehicle_class: Some(VehicleClass::Auto),
            },
        );
        assert_eq!(overlay.edge_weight(99, false), 100.0);
    }

    #[test]
    fn wrapped_weight_stays_within_global_bounds() {
        let fixture = fixture(Some(50.0));
        let flag_combos = [
            (false, false, None),
            (true, false, None),
            (false, true, None),
            (true, true, None),
            (true, true, Some(VehicleClass::Auto)),
            (false, false, Some(VehicleClass::Truck)),
        ];
        for (avoid_eds, avoid_custom_areas, vehicle_class) in flag_combos {
            let overlay = weighting(
                &fixture,
                OverlayFlags {
                    avoid_eds,
                    avoid_custom_areas,
                    vehicle_class,
                },
            );
            for edge in 0..5 {
                let weight = overlay.edge_weight(edge, false);
                assert!(weight >= 100.0 * 0.85 - 1e-9, "floor violated: {weight}");
                assert!(weight <= 100.0 * 13.5 + 1e-9, "ceiling violated: {weight}");
            }
        }
    }

    #[test]
    fn factor_bands_cover_every_difference_band() {
        let cases = [
            (0.0, 0.97, 1.03),
            (5.0, 0.97, 1.03),
            (6.0, 0.95, 1.08),
            (15.0, 0.95, 1.08),
            (16.0, 0.92, 1.15),
            (30.0, 0.92, 1.15),
            (31.0, 0.88, 1.25),
            (50.0, 0.88, 1.25),
            (51.0, 0.85, 1.35),
            (120.0, 0.85, 1.35),
        ];
        for (diff, bonus, penalty) in cases {
            assert_eq!(bonus_factor(diff), bonus, "bonus at diff {diff}");
            assert_eq!(penalty_factor(diff), penalty, "penalty at diff {diff}");
        }
    }

    #[test]
    fn delegated_operations_pass_through() {
        let fixture = fixture(Some(50.0));
        let overlay = weighting(&fixture, OverlayFlags::default());
        assert_eq!(overlay.edge_millis(0, false), 1_000);
        assert_eq!(overlay.turn_weight(0, 1, 2), 0.5);
        assert_eq!(overlay.turn_millis(0, 1, 2), 500);
        assert!(overlay.has_turn_costs());
        assert_eq!(overlay.min_weight_per_distance(), 0.01);
        assert_eq!(overlay.name(), "overlay_constant");
    }

    #[test]
    fn edge_filter_rejects_flagged_edges() {
        let fixture = fixture(Some(50.0));
        let filter = AvoidanceEdgeFilter::new(fixture.eds.clone(), fixture.areas.clone(), true, true);
        assert!(!filter.accept(0));
        assert!(!filter.accept(1));
        assert!(!filter.accept(2));
        assert!(filter.accept(3));
        assert!(filter.accept(4));

        let eds_only = AvoidanceEdgeFilter::new(fixture.eds.clone(), fixture.areas.clone(), true, false);
        assert!(eds_only.accept(1));
        assert!(!eds_only.accept(0));
    }
}
