//! Custom-area feed parsing.
//!
//! The feed is an array of objects with `id`, `location` (a `"lat, lon"`
//! string) and `half_diameter` in meters. Records missing a required field
//! or failing validation are dropped with a warning.

use chrono::Utc;
use serde_json::Value;

use veer_core::geometry::GeoPoint;

use crate::client::FeedError;
use crate::snapshot::{CustomArea, CustomAreaSnapshot};

/// Parse the custom-areas feed body into a snapshot.
pub fn parse_custom_areas(body: &str) -> Result<CustomAreaSnapshot, FeedError> {
    let records: Vec<Value> = serde_json::from_str(body).map_err(|source| FeedError::Json {
        feed: "custom_areas",
        source,
    })?;

    let mut snapshot = CustomAreaSnapshot {
        fetched_at: Some(Utc::now()),
        ..CustomAreaSnapshot::empty()
    };
    let mut skipped = 0usize;

    for record in &records {
        match parse_area(record) {
            Some(area) => {
                snapshot.areas.insert(area.id.clone(), area);
            }
            None => {
                skipped += 1;
                tracing::warn!(record = %record, "custom area with missing or invalid fields skipped");
            }
        }
    }

    tracing::info!(
        areas = snapshot.areas.len(),
        skipped,
        "parsed custom-areas feed"
    );
    Ok(snapshot)
}

fn parse_area(record: &Value) -> Option<CustomArea> {
    let id = value_to_string(record.get("id")?)?;
    let location = record.get("location")?.as_str()?;
    let center = parse_location(location)?;
    let radius_m = value_to_f64(record.get("half_diameter")?)?;
    if !(radius_m.is_finite() && radius_m > 0.0) {
        return None;
    }
    let title = record
        .get("title")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Some(CustomArea {
        id,
        title,
        center,
        radius_m,
    })
}

/// `"lat, lon"` with both parts in valid WGS-84 ranges.
fn parse_location(location: &str) -> Option<GeoPoint> {
    let mut parts = location.split(',');
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lon: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if !((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)) {
        return None;
    }
    Some(GeoPoint::new(lat, lon))
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Upstream sends numbers and stringified numbers interchangeably.
fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
