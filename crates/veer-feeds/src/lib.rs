//! Veer feeds - external avoidance-hint feeds.
//!
//! Fetches and parses the three upstream feeds (EDS corridors, custom
//! areas, per-vehicle speed limits) into immutable snapshots. Scheduling
//! and snapshot publication live in `veer-engine`; this crate only talks
//! HTTP and JSON.

pub mod areas;
pub mod client;
pub mod eds;
pub mod snapshot;
pub mod speed_limits;

pub use areas::parse_custom_areas;
pub use client::{FeedClient, FeedError};
pub use eds::parse_eds;
pub use snapshot::{
    CustomArea, CustomAreaSnapshot, EdsSnapshot, FeedKind, SpeedCorridor, SpeedLimitSnapshot,
};
pub use speed_limits::parse_speed_limits;
