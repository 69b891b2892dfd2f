//! EDS feed parsing.
//!
//! The feed is an array of GeoJSON-like documents, each carrying a
//! `features[]` list. Only `LineString` features with at least two
//! positions survive; everything else is skipped with a warning and the
//! batch continues.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use veer_core::geometry::{GeoPoint, Polyline};

use crate::client::FeedError;
use crate::snapshot::EdsSnapshot;

#[derive(Debug, Deserialize)]
struct EdsDocument {
    #[serde(default)]
    features: Vec<EdsFeature>,
}

#[derive(Debug, Deserialize)]
struct EdsFeature {
    geometry: Option<EdsGeometry>,
    properties: Option<EdsProperties>,
}

#[derive(Debug, Deserialize)]
struct EdsGeometry {
    #[serde(rename = "type")]
    geometry_type: Option<String>,
    /// Kept loose on purpose: upstream has emitted both bare positions and
    /// nested rings here.
    coordinates: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EdsProperties {
    #[serde(rename = "Name")]
    name: Option<String>,
}

/// Parse the EDS feed body into a snapshot.
pub fn parse_eds(body: &str) -> Result<EdsSnapshot, FeedError> {
    let documents: Vec<EdsDocument> = serde_json::from_str(body).map_err(|source| FeedError::Json {
        feed: "eds",
        source,
    })?;

    let mut snapshot = EdsSnapshot {
        fetched_at: Some(Utc::now()),
        ..EdsSnapshot::empty()
    };

    for (doc_index, document) in documents.iter().enumerate() {
        for (feature_index, feature) in document.features.iter().enumerate() {
            let Some(geometry) = &feature.geometry else {
                tracing::warn!(doc_index, feature_index, "EDS feature without geometry skipped");
                continue;
            };
            if geometry.geometry_type.as_deref() != Some("LineString") {
                tracing::debug!(
                    doc_index,
                    feature_index,
                    geometry_type = ?geometry.geometry_type,
                    "non-LineString EDS feature skipped"
                );
                continue;
            }
            let Some(line) = geometry
                .coordinates
                .as_ref()
                .and_then(parse_line_coordinates)
            else {
                tracing::warn!(
                    doc_index,
                    feature_index,
                    "EDS LineString with unusable coordinates skipped"
                );
                continue;
            };

            let corridor_id = feature
                .properties
                .as_ref()
                .and_then(|p| p.name.clone())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| format!("corridor-{doc_index}-{feature_index}"));

            snapshot.corridors.insert(corridor_id, line);
        }
    }

    tracing::info!(
        corridors = snapshot.corridors.len(),
        documents = documents.len(),
        "parsed EDS feed"
    );
    Ok(snapshot)
}

/// `[[lon, lat], ...]` with at least two positions; extra ordinates
/// (altitude) are ignored.
pub(crate) fn parse_line_coordinates(value: &Value) -> Option<Polyline> {
    let positions = value.as_array()?;
    if positions.len() < 2 {
        return None;
    }
    let mut points = Vec::with_capacity(positions.len());
    for position in positions {
        let pair = position.as_array()?;
        if pair.len() < 2 {
            return None;
        }
        let lon = pair[0].as_f64()?;
        let lat = pair[1].as_f64()?;
        points.push(GeoPoint::new(lat, lon));
    }
    Some(Polyline::new(points))
}
