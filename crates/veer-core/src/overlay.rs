//! Edge-keyed overlay tables and their atomically swapped index.
//!
//! Producers build a complete replacement table and install it in one swap;
//! readers take an `Arc` handle and see a single coherent table for as long
//! as they hold it. Entries carry the highest-scoring corridor per edge,
//! with ties resolved by ascending corridor id (producers feed corridors in
//! sorted order and replacement requires a strictly higher score).

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::Serialize;

use crate::graph::EdgeId;
use crate::vehicle::VehicleClass;

/// EDS corridor hit on an edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdsEntry {
    pub match_score: f64,
}

/// Custom-area hit on an edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaEntry {
    pub match_score: f64,
    pub area_id: String,
}

/// Speed-limit corridor hit on an edge, for one vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedLimitEntry {
    pub limit_kmh: u32,
    pub corridor_title: String,
    pub match_score: f64,
}

/// Common shape of the per-edge entry types.
pub trait ScoredEntry {
    fn match_score(&self) -> f64;
}

impl ScoredEntry for EdsEntry {
    fn match_score(&self) -> f64 {
        self.match_score
    }
}

impl ScoredEntry for AreaEntry {
    fn match_score(&self) -> f64 {
        self.match_score
    }
}

impl ScoredEntry for SpeedLimitEntry {
    fn match_score(&self) -> f64 {
        self.match_score
    }
}

/// An edge-keyed overlay table. Immutable once installed in the index.
#[derive(Debug)]
pub struct EdgeTable<E> {
    entries: HashMap<EdgeId, E>,
}

impl<E> Default for EdgeTable<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<E: ScoredEntry> EdgeTable<E> {
    pub fn get(&self, edge: EdgeId) -> Option<&E> {
        self.entries.get(&edge)
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        self.entries.contains_key(&edge)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &E)> {
        self.entries.iter().map(|(edge, entry)| (*edge, entry))
    }

    /// Keep the higher-scoring entry; on an exact tie the incumbent wins, so
    /// feeding corridors in ascending id order makes the result
    /// deterministic.
    pub fn insert_if_better(&mut self, edge: EdgeId, entry: E) {
        match self.entries.get(&edge) {
            Some(existing) if existing.match_score() >= entry.match_score() => {}
            _ => {
                self.entries.insert(edge, entry);
            }
        }
    }
}

/// Edges flagged by EDS corridors.
pub type EdsTable = EdgeTable<EdsEntry>;
/// Edges inside custom avoidance areas.
pub type AreaTable = EdgeTable<AreaEntry>;
/// Edges with a corridor-imposed speed limit for one vehicle class.
pub type SpeedLimitTable = EdgeTable<SpeedLimitEntry>;

/// Per-class speed-limit tables, swapped as one unit.
#[derive(Debug, Default)]
pub struct SpeedLimitTables {
    by_class: HashMap<VehicleClass, Arc<SpeedLimitTable>>,
}

impl SpeedLimitTables {
    pub fn insert(&mut self, class: VehicleClass, table: SpeedLimitTable) {
        self.by_class.insert(class, Arc::new(table));
    }

    pub fn class_table(&self, class: VehicleClass) -> Option<Arc<SpeedLimitTable>> {
        self.by_class.get(&class).cloned()
    }

    pub fn total_entries(&self) -> usize {
        self.by_class.values().map(|table| table.len()).sum()
    }

    pub fn classes(&self) -> impl Iterator<Item = VehicleClass> + '_ {
        self.by_class.keys().copied()
    }
}

/// Coarse counters for the observability endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayStats {
    pub total: usize,
    pub heavy: usize,
    pub moderate: usize,
    pub light: usize,
    pub last_update_ms: i64,
}

const HEAVY_SCORE: f64 = 0.8;
const MODERATE_SCORE: f64 = 0.7;

/// The live overlay tables behind atomic swap slots.
pub struct OverlayIndex {
    eds: RwLock<Arc<EdsTable>>,
    areas: RwLock<Arc<AreaTable>>,
    speed_limits: RwLock<Arc<SpeedLimitTables>>,
    eds_updated_ms: AtomicI64,
    areas_updated_ms: AtomicI64,
    speed_limits_updated_ms: AtomicI64,
}

impl Default for OverlayIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn read_slot<T>(slot: &RwLock<Arc<T>>) -> Arc<T> {
    match slot.read() {
        Ok(guard) => Arc::clone(&guard),
        Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
}

fn write_slot<T>(slot: &RwLock<Arc<T>>, value: T) {
    let value = Arc::new(value);
    match slot.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

impl OverlayIndex {
    pub fn new() -> Self {
        Self {
            eds: RwLock::new(Arc::new(EdsTable::default())),
            areas: RwLock::new(Arc::new(AreaTable::default())),
            speed_limits: RwLock::new(Arc::new(SpeedLimitTables::default())),
            eds_updated_ms: AtomicI64::new(0),
            areas_updated_ms: AtomicI64::new(0),
            speed_limits_updated_ms: AtomicI64::new(0),
        }
    }

    /// Current EDS table handle; constant-time lookups, coherent until dropped.
    pub fn eds(&self) -> Arc<EdsTable> {
        read_slot(&self.eds)
    }

    pub fn areas(&self) -> Arc<AreaTable> {
        read_slot(&self.areas)
    }

    pub fn speed_limits(&self) -> Arc<SpeedLimitTables> {
        read_slot(&self.speed_limits)
    }

    pub fn speed_limit_table(&self, class: VehicleClass) -> Option<Arc<SpeedLimitTable>> {
        self.speed_limits().class_table(class)
    }

    pub fn install_eds(&self, table: EdsTable) {
        let entries = table.len();
        write_slot(&self.eds, table);
        self.eds_updated_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
        tracing::info!(entries, "installed EDS overlay table");
    }

    pub fn install_areas(&self, table: AreaTable) {
        let entries = table.len();
        write_slot(&self.areas, table);
        self.areas_updated_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
        tracing::info!(entries, "installed custom-area overlay table");
    }

    pub fn install_speed_limits(&self, tables: SpeedLimitTables) {
        let entries = tables.total_entries();
        write_slot(&self.speed_limits, tables);
        self.speed_limits_updated_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
        tracing::info!(entries, "installed speed-limit overlay tables");
    }

    pub fn eds_updated_ms(&self) -> i64 {
        self.eds_updated_ms.load(Ordering::SeqCst)
    }

    pub fn areas_updated_ms(&self) -> i64 {
        self.areas_updated_ms.load(Ordering::SeqCst)
    }

    pub fn speed_limits_updated_ms(&self) -> i64 {
        self.speed_limits_updated_ms.load(Ordering::SeqCst)
    }

    /// Counters over the EDS table, banded by match score.
    pub fn stats(&self) -> OverlayStats {
        let table = self.eds();
        let mut heavy = 0;
        let mut moderate = 0;
        let mut light = 0;
        for (_, entry) in table.iter() {
            if entry.match_score >= HEAVY_SCORE {
                heavy += 1;
            } else if entry.match_score >= MODERATE_SCORE {
                moderate += 1;
            } else {
                light += 1;
            }
        }
        OverlayStats {
            total: table.len(),
            heavy,
            moderate,
            light,
            last_update_ms: self.eds_updated_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_better_keeps_highest_score() {
        let mut table = EdsTable::default();
        table.insert_if_better(7, EdsEntry { match_score: 0.8 });
        table.insert_if_better(7, EdsEntry { match_score: 0.7 });
        assert_eq!(table.get(7).unwrap().match_score, 0.8);
        table.insert_if_better(7, EdsEntry { match_score: 0.9 });
        assert_eq!(table.get(7).unwrap().match_score, 0.9);
    }

    #[test]
    fn exact_tie_keeps_the_incumbent() {
        let mut table = AreaTable::default();
        table.insert_if_better(
            3,
            AreaEntry {
                match_score: 0.5,
                area_id: "area-1".to_string(),
            },
        );
        table.insert_if_better(
            3,
            AreaEntry {
                match_score: 0.5,
                area_id: "area-2".to_string(),
            },
        );
        assert_eq!(table.get(3).unwrap().area_id, "area-1");
    }

    #[test]
    fn install_swaps_whole_tables() {
        let index = OverlayIndex::new();
        let before = index.eds();
        assert!(before.is_empty());

        let mut table = EdsTable::default();
        table.insert_if_better(1, EdsEntry { match_score: 0.9 });
        index.install_eds(table);

        // The old handle still reads the old table; new reads see the swap.
        assert!(before.is_empty());
        assert!(index.eds().contains(1));
        assert!(index.eds_updated_ms() > 0);
    }

    #[test]
    fn stats_band_by_match_score() {
        let index = OverlayIndex::new();
        let mut table = EdsTable::default();
        table.insert_if_better(1, EdsEntry { match_score: 0.95 });
        table.insert_if_better(2, EdsEntry { match_score: 0.75 });
        table.insert_if_better(3, EdsEntry { match_score: 0.61 });
        index.install_eds(table);

        let stats = index.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.heavy, 1);
        assert_eq!(stats.moderate, 1);
        assert_eq!(stats.light, 1);
    }

    #[test]
    fn speed_limit_tables_are_keyed_by_class() {
        let index = OverlayIndex::new();
        let mut tables = SpeedLimitTables::default();
        let mut truck = SpeedLimitTable::default();
        truck.insert_if_better(
            4,
            SpeedLimitEntry {
                limit_kmh: 60,
                corridor_title: "ring road".to_string(),
                match_score: 0.8,
            },
        );
        tables.insert(VehicleClass::Truck, truck);
        index.install_speed_limits(tables);

        assert!(index.speed_limit_table(VehicleClass::Truck).is_some());
        assert!(index.speed_limit_table(VehicleClass::Auto).is_none());
        let table = index.speed_limit_table(VehicleClass::Truck).unwrap();
        assert_eq!(table.get(4).unwrap().limit_kmh, 60);
    }
}
