//! Atomic snapshot slots for the three feeds.
//!
//! A failed fetch never touches a slot; readers either see the previous
//! snapshot whole or the new one whole. Versions are assigned at install
//! time and increase monotonically per feed.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeZone, Utc};

use veer_feeds::{CustomAreaSnapshot, EdsSnapshot, FeedKind, SpeedLimitSnapshot};

struct Slot<T> {
    current: RwLock<Arc<T>>,
    last_success_ms: AtomicI64,
    version: AtomicU64,
}

impl<T> Slot<T> {
    fn new(empty: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(empty)),
            last_success_ms: AtomicI64::new(0),
            version: AtomicU64::new(0),
        }
    }

    fn read(&self) -> Arc<T> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn install(&self, value: T) {
        let value = Arc::new(value);
        match self.current.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
        self.last_success_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    fn last_success(&self) -> Option<DateTime<Utc>> {
        let millis = self.last_success_ms.load(Ordering::SeqCst);
        if millis == 0 {
            return None;
        }
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// Holds the most recent successfully parsed snapshot per feed.
pub struct FeedStore {
    eds: Slot<EdsSnapshot>,
    areas: Slot<CustomAreaSnapshot>,
    speed_limits: Slot<SpeedLimitSnapshot>,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    pub fn new() -> Self {
        Self {
            eds: Slot::new(EdsSnapshot::empty()),
            areas: Slot::new(CustomAreaSnapshot::empty()),
            speed_limits: Slot::new(SpeedLimitSnapshot::empty()),
        }
    }

    /// Most recent EDS snapshot; empty until the first successful fetch.
    pub fn eds(&self) -> Arc<EdsSnapshot> {
        self.eds.read()
    }

    pub fn custom_areas(&self) -> Arc<CustomAreaSnapshot> {
        self.areas.read()
    }

    pub fn speed_limits(&self) -> Arc<SpeedLimitSnapshot> {
        self.speed_limits.read()
    }

    pub fn install_eds(&self, mut snapshot: EdsSnapshot) -> u64 {
        let version = self.eds.next_version();
        snapshot.version = version;
        let corridors = snapshot.len();
        self.eds.install(snapshot);
        tracing::info!(corridors, version, "installed EDS snapshot");
        version
    }

    pub fn install_custom_areas(&self, mut snapshot: CustomAreaSnapshot) -> u64 {
        let version = self.areas.next_version();
        snapshot.version = version;
        let areas = snapshot.len();
        self.areas.install(snapshot);
        tracing::info!(areas, version, "installed custom-area snapshot");
        version
    }

    pub fn install_speed_limits(&self, mut snapshot: SpeedLimitSnapshot) -> u64 {
        let version = self.speed_limits.next_version();
        snapshot.version = version;
        let corridors = snapshot.total_corridors();
        self.speed_limits.install(snapshot);
        tracing::info!(corridors, version, "installed speed-limit snapshot");
        version
    }

    /// Wall-clock time of the last successful install, `None` if never.
    pub fn last_success(&self, kind: FeedKind) -> Option<DateTime<Utc>> {
        match kind {
            FeedKind::Eds => self.eds.last_success(),
            FeedKind::CustomAreas => self.areas.last_success(),
            FeedKind::SpeedLimits => self.speed_limits.last_success(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_first_install() {
        let store = FeedStore::new();
        assert!(store.eds().is_empty());
        assert!(store.custom_areas().is_empty());
        assert!(store.speed_limits().is_empty());
        for kind in FeedKind::all() {
            assert!(store.last_success(kind).is_none());
        }
    }

    #[test]
    fn installs_bump_versions_and_stamps() {
        let store = FeedStore::new();
        let v1 = store.install_eds(EdsSnapshot::empty());
        let v2 = store.install_eds(EdsSnapshot::empty());
        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
        assert!(store.last_success(FeedKind::Eds).is_some());
        assert_eq!(store.eds().version, 2);
        assert!(store.last_success(FeedKind::CustomAreas).is_none());
    }

    #[test]
    fn old_handles_survive_installs() {
        let store = FeedStore::new();
        let before = store.eds();
        let mut snapshot = EdsSnapshot::empty();
        snapshot.corridors.insert(
            "main".to_string(),
            veer_core::Polyline::from_coords(&[(37.9, 32.5), (37.91, 32.5)]),
        );
        store.install_eds(snapshot);
        assert!(before.is_empty());
        assert_eq!(store.eds().len(), 1);
    }
}
