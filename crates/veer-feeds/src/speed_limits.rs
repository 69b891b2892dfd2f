//! Speed-limit feed parsing.
//!
//! Paged envelope `{data: {items: [...]}}`; each item carries a line string
//! and a `cars[]` list of per-class limits. One corridor entry is produced
//! per `(item, car)` pair. Unknown vehicle classes and non-positive limits
//! are skipped.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use veer_core::VehicleClass;

use crate::client::FeedError;
use crate::eds::parse_line_coordinates;
use crate::snapshot::{SpeedCorridor, SpeedLimitSnapshot};

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<DataPage>,
}

#[derive(Debug, Deserialize)]
struct DataPage {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<i64>,
    title: Option<String>,
    linestring: Option<LineStringGeometry>,
    #[serde(default)]
    cars: Vec<CarLimit>,
}

#[derive(Debug, Deserialize)]
struct LineStringGeometry {
    coordinates: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CarLimit {
    car_id: Option<i64>,
    speed: Option<i64>,
}

/// Parse the speed-limit feed body into a snapshot.
pub fn parse_speed_limits(body: &str) -> Result<SpeedLimitSnapshot, FeedError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|source| FeedError::Json {
        feed: "speed_limits",
        source,
    })?;

    let mut snapshot = SpeedLimitSnapshot {
        fetched_at: Some(Utc::now()),
        ..SpeedLimitSnapshot::empty()
    };

    let items = envelope.data.map(|page| page.items).unwrap_or_default();
    let mut skipped_items = 0usize;
    let mut skipped_cars = 0usize;

    for item in &items {
        let Some(item_id) = item.id else {
            skipped_items += 1;
            tracing::warn!("speed-limit item without id skipped");
            continue;
        };
        let Some(geometry) = item
            .linestring
            .as_ref()
            .and_then(|ls| ls.coordinates.as_ref())
            .and_then(parse_line_coordinates)
        else {
            skipped_items += 1;
            tracing::warn!(item_id, "speed-limit item with unusable geometry skipped");
            continue;
        };
        let title = item.title.clone().unwrap_or_default();

        for car in &item.cars {
            let Some(class) = car.car_id.and_then(VehicleClass::from_id) else {
                skipped_cars += 1;
                tracing::debug!(item_id, car_id = ?car.car_id, "unknown vehicle class skipped");
                continue;
            };
            let Some(speed) = car.speed.filter(|s| *s > 0) else {
                skipped_cars += 1;
                tracing::warn!(item_id, class = class.name(), "non-positive speed limit skipped");
                continue;
            };

            snapshot.by_class.entry(class).or_default().insert(
                item_id.to_string(),
                SpeedCorridor {
                    corridor_id: item_id.to_string(),
                    title: title.clone(),
                    geometry: geometry.clone(),
                    limit_kmh: speed as u32,
                },
            );
        }
    }

    tracing::info!(
        corridors = snapshot.total_corridors(),
        classes = snapshot.by_class.len(),
        skipped_items,
        skipped_cars,
        "parsed speed-limit feed"
    );
    Ok(snapshot)
}
