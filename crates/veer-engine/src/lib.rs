//! Veer engine - lifecycle container for the overlay pipeline.
//!
//! Owns the feed client, the snapshot store and the overlay index, and
//! rebuilds edge tables by running the matchers over fresh snapshots. The
//! host router talks to one `OverlayEngine`; two engines in one process do
//! not interfere.

pub mod config;
pub mod loops;
pub mod status;
pub mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use veer_core::{
    AreaEntry, AreaMatcher, AreaTable, BoundRequest, CorridorMatcher, EdgeGeometryCache, EdsEntry,
    EdsTable, MatchParams, OverlayFlags, OverlayIndex, OverlayStats, OverlayWeighting,
    RequestBinder, RoadGraph, RouteRequest, SpeedLimitEntry, SpeedLimitTable, SpeedLimitTables,
    Weighting,
};
use veer_feeds::{FeedClient, FeedKind};

pub use config::OverlayConfig;
pub use status::{EdgeOverlaySample, StatusReport};
pub use store::FeedStore;

const STATUS_SAMPLE_LIMIT: usize = 10;

/// The overlay subsystem's container object.
pub struct OverlayEngine {
    config: OverlayConfig,
    graph: Arc<dyn RoadGraph>,
    feeds: FeedClient,
    store: FeedStore,
    index: OverlayIndex,
    geometry_cache: Arc<EdgeGeometryCache>,
    corridor_matcher: CorridorMatcher,
    area_matcher: AreaMatcher,
    binder: RequestBinder,
    feeds_started: AtomicBool,
}

impl OverlayEngine {
    pub fn new(config: OverlayConfig, graph: Arc<dyn RoadGraph>) -> Result<Arc<Self>> {
        let feeds = FeedClient::new(
            config.eds_url.clone(),
            config.custom_areas_url.clone(),
            config.speed_limits_url.clone(),
        )?;
        let geometry_cache = Arc::new(EdgeGeometryCache::new(graph.clone()));
        let binder = RequestBinder::new(config.traffic_aware);
        tracing::info!(
            edges = graph.edge_count(),
            traffic_aware = config.traffic_aware,
            "overlay engine created"
        );
        Ok(Arc::new(Self {
            config,
            graph,
            feeds,
            store: FeedStore::new(),
            index: OverlayIndex::new(),
            corridor_matcher: CorridorMatcher::new(geometry_cache.clone()),
            area_matcher: AreaMatcher::new(geometry_cache.clone()),
            geometry_cache,
            binder,
            feeds_started: AtomicBool::new(false),
        }))
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<dyn RoadGraph> {
        &self.graph
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn index(&self) -> &OverlayIndex {
        &self.index
    }

    /// Force an immediate fetch-and-rebuild of one feed.
    ///
    /// On failure the previous snapshot and table stay live; the caller (or
    /// the scheduler) retries on the next tick.
    pub async fn refresh(self: &Arc<Self>, kind: FeedKind) -> Result<()> {
        match kind {
            FeedKind::Eds => {
                let snapshot = self.feeds.fetch_eds().await?;
                self.store.install_eds(snapshot);
            }
            FeedKind::CustomAreas => {
                let snapshot = self.feeds.fetch_custom_areas().await?;
                self.store.install_custom_areas(snapshot);
            }
            FeedKind::SpeedLimits => {
                let snapshot = self.feeds.fetch_speed_limits().await?;
                self.store.install_speed_limits(snapshot);
            }
        }

        let engine = Arc::clone(self);
        tokio::task::spawn_blocking(move || engine.rebuild_from_store(kind))
            .await
            .context("overlay rebuild task failed")?;
        Ok(())
    }

    /// Re-run matching from the current snapshot without fetching.
    pub fn rebuild_from_store(&self, kind: FeedKind) {
        match kind {
            FeedKind::Eds => self.rebuild_eds(),
            FeedKind::CustomAreas => self.rebuild_areas(),
            FeedKind::SpeedLimits => self.rebuild_speed_limits(),
        }
    }

    fn rebuild_eds(&self) {
        let snapshot = self.store.eds();
        let params = MatchParams::eds();
        let mut table = EdsTable::default();
        let mut matched_corridors = 0usize;
        for (corridor_id, line) in &snapshot.corridors {
            let matches = self.corridor_matcher.matches(line, &params);
            if matches.is_empty() {
                tracing::debug!(corridor_id = %corridor_id, "EDS corridor matched no edges");
            } else {
                matched_corridors += 1;
            }
            for m in matches {
                table.insert_if_better(m.edge, EdsEntry { match_score: m.score });
            }
        }
        tracing::info!(
            corridors = snapshot.len(),
            matched_corridors,
            edges = table.len(),
            "rebuilt EDS table"
        );
        self.index.install_eds(table);
    }

    fn rebuild_areas(&self) {
        let snapshot = self.store.custom_areas();
        let mut table = AreaTable::default();
        for (area_id, area) in &snapshot.areas {
            let matches = self.area_matcher.matches(area.center, area.radius_m);
            tracing::debug!(area_id = %area_id, edges = matches.len(), "matched custom area");
            for m in matches {
                table.insert_if_better(
                    m.edge,
                    AreaEntry {
                        match_score: m.score,
                        area_id: area_id.clone(),
                    },
                );
            }
        }
        tracing::info!(
            areas = snapshot.len(),
            edges = table.len(),
            "rebuilt custom-area table"
        );
        self.index.install_areas(table);
    }

    fn rebuild_speed_limits(&self) {
        let snapshot = self.store.speed_limits();
        let params = MatchParams::speed_limit();
        let mut tables = SpeedLimitTables::default();
        for (class, corridors) in &snapshot.by_class {
            let mut table = SpeedLimitTable::default();
            for corridor in corridors.values() {
                let matches = self.corridor_matcher.matches(&corridor.geometry, &params);
                for m in matches {
                    table.insert_if_better(
                        m.edge,
                        SpeedLimitEntry {
                            limit_kmh: corridor.limit_kmh,
                            corridor_title: corridor.title.clone(),
                            match_score: m.score,
                        },
                    );
                }
            }
            tracing::debug!(class = class.name(), edges = table.len(), "rebuilt class table");
            tables.insert(*class, table);
        }
        tracing::info!(
            corridors = snapshot.total_corridors(),
            edges = tables.total_entries(),
            "rebuilt speed-limit tables"
        );
        self.index.install_speed_limits(tables);
    }

    /// Read request flags and prepare the router invocation.
    pub fn bind_request(&self, request: &RouteRequest) -> BoundRequest {
        self.binder.bind(request)
    }

    /// Wrap a base weighting with the current overlay tables.
    ///
    /// Table handles are captured here; the returned weighting is immune to
    /// concurrent refreshes for the rest of the request.
    pub fn overlay_weighting(
        &self,
        base: Arc<dyn Weighting>,
        flags: &OverlayFlags,
    ) -> OverlayWeighting {
        let speed_limits = flags
            .vehicle_class
            .and_then(|class| self.index.speed_limit_table(class));
        OverlayWeighting::new(
            base,
            self.graph.clone(),
            self.index.eds(),
            self.index.areas(),
            speed_limits,
            *flags,
        )
    }

    pub fn overlay_stats(&self) -> OverlayStats {
        self.index.stats()
    }

    /// True while the newest successful install is within its feed's stale
    /// window. An empty-but-fresh snapshot counts as recent.
    pub fn has_recent_data(&self) -> bool {
        let now = Utc::now();
        FeedKind::all().iter().any(|kind| {
            self.store.last_success(*kind).is_some_and(|at| {
                let age = (now - at).to_std().unwrap_or_default();
                age <= kind.stale_after()
            })
        })
    }

    /// The status document served by the host's observability endpoint.
    pub fn status(&self, debug: bool) -> StatusReport {
        StatusReport {
            feed_running: self.feeds_started.load(Ordering::SeqCst),
            eds_entries: self.store.eds().len(),
            overlay_stats: self.index.stats(),
            timestamp: Utc::now(),
            geometry_cache_entries: self.geometry_cache.len(),
            sample_edges: debug.then(|| self.sample_edges()),
        }
    }

    fn sample_edges(&self) -> Vec<EdgeOverlaySample> {
        let mut samples = Vec::with_capacity(STATUS_SAMPLE_LIMIT);
        let eds = self.index.eds();
        let mut eds_edges: Vec<_> = eds.iter().collect();
        eds_edges.sort_by_key(|(edge, _)| *edge);
        for (edge, entry) in eds_edges {
            if samples.len() >= STATUS_SAMPLE_LIMIT {
                return samples;
            }
            samples.push(EdgeOverlaySample {
                edge,
                overlay: "eds",
                match_score: entry.match_score,
                detail: None,
            });
        }
        let areas = self.index.areas();
        let mut area_edges: Vec<_> = areas.iter().collect();
        area_edges.sort_by_key(|(edge, _)| *edge);
        for (edge, entry) in area_edges {
            if samples.len() >= STATUS_SAMPLE_LIMIT {
                return samples;
            }
            samples.push(EdgeOverlaySample {
                edge,
                overlay: "custom_area",
                match_score: entry.match_score,
                detail: Some(entry.area_id.clone()),
            });
        }
        let speed_limits = self.index.speed_limits();
        let mut classes: Vec<_> = speed_limits.classes().collect();
        classes.sort();
        for class in classes {
            let Some(table) = speed_limits.class_table(class) else {
                continue;
            };
            let mut entries: Vec<_> = table.iter().collect();
            entries.sort_by_key(|(edge, _)| *edge);
            for (edge, entry) in entries {
                if samples.len() >= STATUS_SAMPLE_LIMIT {
                    return samples;
                }
                samples.push(EdgeOverlaySample {
                    edge,
                    overlay: "speed_limit",
                    match_score: entry.match_score,
                    detail: Some(format!("{} @ {} km/h", class.name(), entry.limit_kmh)),
                });
            }
        }
        samples
    }

    /// Drop derived geometry caches. Never touches snapshots or tables.
    pub fn clear_caches(&self) {
        self.geometry_cache.clear();
        tracing::info!("overlay geometry caches cleared");
    }

    pub(crate) fn mark_feeds_started(&self) {
        self.feeds_started.store(true, Ordering::SeqCst);
    }
}
