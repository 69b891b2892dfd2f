//! Immutable feed snapshots.
//!
//! A snapshot is the parsed result of one successful fetch. Consumers never
//! mutate one in place; refreshes build a new snapshot and swap it in.
//! Corridors and areas are keyed through `BTreeMap` so every consumer
//! iterates them in ascending id order, which is what makes the overlay
//! tie-break deterministic.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use veer_core::geometry::{GeoPoint, Polyline};
use veer_core::VehicleClass;

/// The three upstream feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Eds,
    CustomAreas,
    SpeedLimits,
}

impl FeedKind {
    pub fn all() -> [FeedKind; 3] {
        [Self::Eds, Self::CustomAreas, Self::SpeedLimits]
    }

    /// Scheduled refresh period.
    pub fn period(self) -> Duration {
        match self {
            Self::Eds => Duration::from_secs(24 * 60 * 60),
            Self::CustomAreas | Self::SpeedLimits => Duration::from_secs(6 * 60 * 60),
        }
    }

    /// How long the last snapshot keeps being served before it counts as
    /// stale.
    pub fn stale_after(self) -> Duration {
        match self {
            Self::Eds => Duration::from_secs(48 * 60 * 60),
            Self::CustomAreas | Self::SpeedLimits => Duration::from_secs(12 * 60 * 60),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Eds => "eds",
            Self::CustomAreas => "custom_areas",
            Self::SpeedLimits => "speed_limits",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// EDS corridors by stable road name.
#[derive(Debug, Clone, Default)]
pub struct EdsSnapshot {
    pub corridors: BTreeMap<String, Polyline>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl EdsSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.corridors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.corridors.len()
    }
}

/// One circular avoidance zone.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomArea {
    pub id: String,
    pub title: Option<String>,
    pub center: GeoPoint,
    pub radius_m: f64,
}

/// Custom areas by id.
#[derive(Debug, Clone, Default)]
pub struct CustomAreaSnapshot {
    pub areas: BTreeMap<String, CustomArea>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl CustomAreaSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }
}

/// One speed-limit corridor for one vehicle class.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedCorridor {
    pub corridor_id: String,
    pub title: String,
    pub geometry: Polyline,
    pub limit_kmh: u32,
}

/// Speed-limit corridors, grouped per vehicle class and keyed by corridor
/// id. One entry exists per `(item, car)` pair of the wire format.
#[derive(Debug, Clone, Default)]
pub struct SpeedLimitSnapshot {
    pub by_class: BTreeMap<VehicleClass, BTreeMap<String, SpeedCorridor>>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl SpeedLimitSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_class.values().all(|corridors| corridors.is_empty())
    }

    pub fn total_corridors(&self) -> usize {
        self.by_class.values().map(|corridors| corridors.len()).sum()
    }

    pub fn class_corridors(&self, class: VehicleClass) -> Option<&BTreeMap<String, SpeedCorridor>> {
        self.by_class.get(&class)
    }
}
