//! Veer core - overlay matching and weighting for road routing.
//!
//! This crate contains the pure CPU side of the overlay pipeline:
//! matching feed geometries against a road graph, the edge-keyed overlay
//! tables, the wrapping cost function and the per-request binder.
//! It never performs I/O; feeds and scheduling live in the sibling crates.

pub mod binder;
pub mod geometry;
pub mod graph;
pub mod hints;
pub mod matching;
pub mod overlay;
pub mod vehicle;
pub mod weighting;

pub use binder::{AlternativeRouteParams, BoundRequest, RequestBinder, RouteRequest};
pub use geometry::{BoundingBox, CirclePolygon, GeoPoint, Polyline};
pub use graph::{EdgeEndpoints, EdgeId, NodeId, RoadGraph, VectorGraph};
pub use hints::{HintMap, HintValue};
pub use matching::{AreaMatcher, CorridorMatcher, EdgeGeometryCache, EdgeMatch, MatchParams};
pub use overlay::{
    AreaEntry, AreaTable, EdgeTable, EdsEntry, EdsTable, OverlayIndex, OverlayStats,
    SpeedLimitEntry, SpeedLimitTable, SpeedLimitTables,
};
pub use vehicle::VehicleClass;
pub use weighting::{AvoidanceEdgeFilter, OverlayFlags, OverlayWeighting, Weighting};
