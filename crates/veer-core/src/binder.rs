//! Per-request binding: read overlay flags, pick router parameters.
//!
//! The binder never mutates the incoming request. It produces a fresh
//! request object carrying the routing-algorithm hints plus the resolved
//! overlay flags, and the caller hands both to the host router.

use serde::Serialize;

use crate::hints::HintMap;
use crate::vehicle::VehicleClass;
use crate::weighting::OverlayFlags;

pub mod keys {
    //! String keys shared with the host router's hint bag.

    pub const AVOID_EDS_ROADS: &str = "avoid_eds_roads";
    pub const AVOID_CUSTOM_AREAS: &str = "avoid_custom_areas";
    pub const ENABLE_SPEED_LIMITS: &str = "enable_speed_limits";
    pub const CAR_TYPE_ID: &str = "car_type_id";
    pub const TRAFFIC_AWARE: &str = "traffic_aware";

    pub const CH_DISABLE: &str = "ch.disable";
    pub const LANDMARK_DISABLE: &str = "lm.disable";

    pub const ALT_MAX_PATHS: &str = "alternative_route.max_paths";
    pub const ALT_MAX_WEIGHT_FACTOR: &str = "alternative_route.max_weight_factor";
    pub const ALT_MAX_SHARE_FACTOR: &str = "alternative_route.max_share_factor";
    pub const ALT_MAX_EXPLORATION_FACTOR: &str = "alternative_route.max_exploration_factor";
}

pub const ALTERNATIVE_ROUTE_ALGORITHM: &str = "alternative_route";

/// An immutable routing request as the binder sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRequest {
    pub profile: String,
    pub algorithm: Option<String>,
    pub hints: HintMap,
}

impl RouteRequest {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            algorithm: None,
            hints: HintMap::new(),
        }
    }

    pub fn with_bool_hint(mut self, key: &str, value: bool) -> Self {
        self.hints.put_bool(key, value);
        self
    }

    pub fn with_int_hint(mut self, key: &str, value: i64) -> Self {
        self.hints.put_int(key, value);
        self
    }
}

/// Alternative-route search parameters handed to the router.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlternativeRouteParams {
    pub max_paths: u32,
    pub max_weight_factor: f64,
    pub max_share_factor: f64,
    pub max_exploration_factor: f64,
}

impl AlternativeRouteParams {
    /// Both avoidance systems active: balanced widening.
    pub fn dual_avoidance() -> Self {
        Self {
            max_paths: 3,
            max_weight_factor: 1.5,
            max_share_factor: 0.7,
            max_exploration_factor: 1.3,
        }
    }

    /// Areas can be large, so give the search more room.
    pub fn custom_areas_only() -> Self {
        Self {
            max_paths: 3,
            max_weight_factor: 2.0,
            max_share_factor: 0.5,
            max_exploration_factor: 1.5,
        }
    }

    pub fn eds_only() -> Self {
        Self {
            max_paths: 3,
            max_weight_factor: 1.3,
            max_share_factor: 0.7,
            max_exploration_factor: 1.2,
        }
    }

    /// Defaults when no avoidance is active but the caller asked for
    /// alternatives anyway.
    pub fn no_avoidance() -> Self {
        Self {
            max_paths: 3,
            max_weight_factor: 1.4,
            max_share_factor: 0.6,
            max_exploration_factor: 1.3,
        }
    }

    pub fn for_avoidance(avoid_eds: bool, avoid_custom_areas: bool) -> Self {
        match (avoid_eds, avoid_custom_areas) {
            (true, true) => Self::dual_avoidance(),
            (false, true) => Self::custom_areas_only(),
            (true, false) => Self::eds_only(),
            (false, false) => Self::no_avoidance(),
        }
    }

    fn write_into(&self, hints: &mut HintMap) {
        hints.put_int(keys::ALT_MAX_PATHS, i64::from(self.max_paths));
        hints.put_float(keys::ALT_MAX_WEIGHT_FACTOR, self.max_weight_factor);
        hints.put_float(keys::ALT_MAX_SHARE_FACTOR, self.max_share_factor);
        hints.put_float(keys::ALT_MAX_EXPLORATION_FACTOR, self.max_exploration_factor);
    }
}

/// Outcome of binding one request.
#[derive(Debug, Clone)]
pub struct BoundRequest {
    /// The rewritten request for the downstream router.
    pub request: RouteRequest,
    /// Overlays the weighting should apply.
    pub flags: OverlayFlags,
    /// Whether precomputed speedups (CH, landmarks) were disabled.
    pub speedup_disabled: bool,
    /// The alternative-route parameters in effect for this request.
    pub alternatives: AlternativeRouteParams,
}

/// Reads per-request flags and prepares the router invocation.
pub struct RequestBinder {
    traffic_aware_enabled: bool,
}

impl RequestBinder {
    pub fn new(traffic_aware_enabled: bool) -> Self {
        Self {
            traffic_aware_enabled,
        }
    }

    /// Bind a request. Always returns a new request object; the input is
    /// never modified.
    pub fn bind(&self, request: &RouteRequest) -> BoundRequest {
        if !self.traffic_aware_enabled || !request.hints.get_bool(keys::TRAFFIC_AWARE, true) {
            tracing::debug!("traffic-aware routing disabled, request passed through");
            return Self::passthrough(request);
        }

        let avoid_eds = request.hints.get_bool(keys::AVOID_EDS_ROADS, false);
        let avoid_custom_areas = request.hints.get_bool(keys::AVOID_CUSTOM_AREAS, false);
        let enable_speed_limits = request.hints.get_bool(keys::ENABLE_SPEED_LIMITS, true);
        let car_type_id = request.hints.get_int(keys::CAR_TYPE_ID, 0);

        let mut vehicle_class = if enable_speed_limits {
            VehicleClass::from_id(car_type_id)
        } else {
            None
        };
        if vehicle_class.is_some() && is_non_motorized_profile(&request.profile) {
            tracing::debug!(
                profile = %request.profile,
                "speed-limit overlay bypassed for non-motorized profile"
            );
            vehicle_class = None;
        }

        let flags = OverlayFlags {
            avoid_eds,
            avoid_custom_areas,
            vehicle_class,
        };

        let mut bound = request.clone();
        let speedup_disabled = flags.any_active();
        if speedup_disabled {
            bound.hints.put_bool(keys::CH_DISABLE, true);
            bound.hints.put_bool(keys::LANDMARK_DISABLE, true);
        }

        let alternatives = AlternativeRouteParams::for_avoidance(avoid_eds, avoid_custom_areas);
        if flags.avoidance_active() {
            bound.algorithm = Some(ALTERNATIVE_ROUTE_ALGORITHM.to_string());
            alternatives.write_into(&mut bound.hints);
        } else if bound.algorithm.as_deref() == Some(ALTERNATIVE_ROUTE_ALGORITHM) {
            // The caller asked for alternatives on its own; fill in defaults
            // without clobbering anything explicit.
            if !bound.hints.contains_key(keys::ALT_MAX_PATHS) {
                alternatives.write_into(&mut bound.hints);
            }
        }

        tracing::info!(
            profile = %request.profile,
            avoid_eds,
            avoid_custom_areas,
            vehicle_class = ?flags.vehicle_class,
            speedup_disabled,
            "request bound"
        );

        BoundRequest {
            request: bound,
            flags,
            speedup_disabled,
            alternatives,
        }
    }

    fn passthrough(request: &RouteRequest) -> BoundRequest {
        BoundRequest {
            request: request.clone(),
            flags: OverlayFlags::default(),
            speedup_disabled: false,
            alternatives: AlternativeRouteParams::no_avoidance(),
        }
    }
}

fn is_non_motorized_profile(profile: &str) -> bool {
    matches!(profile, "foot" | "hike" | "bike" | "mtb" | "racingbike" | "pedestrian" | "bicycle")
}
