//! Serializable status payloads for the host's observability endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

use veer_core::{EdgeId, OverlayStats};

/// One sampled overlay record, emitted only in debug mode.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeOverlaySample {
    pub edge: EdgeId,
    /// Which table the record comes from: `eds`, `custom_area` or
    /// `speed_limit`.
    pub overlay: &'static str,
    pub match_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The read-only status document the host serves as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub feed_running: bool,
    pub eds_entries: usize,
    pub overlay_stats: OverlayStats,
    pub timestamp: DateTime<Utc>,
    pub geometry_cache_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_edges: Option<Vec<EdgeOverlaySample>>,
}
