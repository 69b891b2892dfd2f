//! Background refresh loops for the three feeds.
//!
//! One loop per feed: an immediate first tick (the startup fetch), then the
//! feed's period. Failures are logged and retried on the next tick. On
//! shutdown an in-flight refresh gets a short grace period before it is
//! abandoned.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Duration};

use veer_feeds::FeedKind;

use crate::OverlayEngine;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Spawn one refresh loop per feed.
///
/// Returns the shutdown sender (send `()` once to stop all loops) and the
/// join handles. Marks the engine's feeds as running for the status report.
pub fn spawn_refresh_loops(
    engine: &Arc<OverlayEngine>,
) -> (broadcast::Sender<()>, Vec<JoinHandle<()>>) {
    let (shutdown_tx, _) = broadcast::channel(1);
    engine.mark_feeds_started();
    let handles = FeedKind::all()
        .into_iter()
        .map(|kind| {
            tokio::spawn(run_refresh_loop(
                Arc::clone(engine),
                kind,
                shutdown_tx.subscribe(),
            ))
        })
        .collect();
    (shutdown_tx, handles)
}

/// Drive one feed until shutdown.
pub async fn run_refresh_loop(
    engine: Arc<OverlayEngine>,
    kind: FeedKind,
    mut shutdown: broadcast::Receiver<()>,
) {
    let period = engine.config().period_for(kind);
    let mut ticker = interval(period);
    tracing::info!(feed = %kind, period_secs = period.as_secs(), "refresh loop started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!(feed = %kind, "refresh loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let refresh = engine.refresh(kind);
                tokio::pin!(refresh);
                tokio::select! {
                    result = &mut refresh => {
                        if let Err(err) = result {
                            tracing::warn!(feed = %kind, "feed refresh failed, serving previous snapshot: {err:#}");
                        }
                    }
                    _ = shutdown.recv() => {
                        match timeout(SHUTDOWN_GRACE, &mut refresh).await {
                            Ok(Ok(())) => {
                                tracing::info!(feed = %kind, "in-flight refresh finished during shutdown");
                            }
                            Ok(Err(err)) => {
                                tracing::warn!(feed = %kind, "in-flight refresh failed during shutdown: {err:#}");
                            }
                            Err(_) => {
                                tracing::warn!(feed = %kind, "in-flight refresh aborted after shutdown grace period");
                            }
                        }
                        tracing::info!(feed = %kind, "refresh loop shutting down");
                        break;
                    }
                }
            }
        }
    }
}
