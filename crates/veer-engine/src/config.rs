//! Engine configuration from environment.

use std::env;
use std::time::Duration;

use veer_feeds::FeedKind;

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub eds_url: String,
    pub custom_areas_url: String,
    pub speed_limits_url: String,
    /// Master toggle; when false every request passes through unchanged.
    pub traffic_aware: bool,
    pub eds_period: Duration,
    pub custom_areas_period: Duration,
    pub speed_limits_period: Duration,
}

impl OverlayConfig {
    /// Plain constructor with the standard feed periods.
    pub fn new(
        eds_url: impl Into<String>,
        custom_areas_url: impl Into<String>,
        speed_limits_url: impl Into<String>,
    ) -> Self {
        Self {
            eds_url: eds_url.into(),
            custom_areas_url: custom_areas_url.into(),
            speed_limits_url: speed_limits_url.into(),
            traffic_aware: true,
            eds_period: FeedKind::Eds.period(),
            custom_areas_period: FeedKind::CustomAreas.period(),
            speed_limits_period: FeedKind::SpeedLimits.period(),
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::new(
            env::var("VEER_EDS_URL").unwrap_or_default(),
            env::var("VEER_CUSTOM_AREAS_URL").unwrap_or_default(),
            env::var("VEER_SPEED_LIMITS_URL").unwrap_or_default(),
        );
        config.traffic_aware = env::var("VEER_TRAFFIC_AWARE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);
        if let Some(period) = period_from_env("VEER_EDS_PERIOD_SECS") {
            config.eds_period = period;
        }
        if let Some(period) = period_from_env("VEER_CUSTOM_AREAS_PERIOD_SECS") {
            config.custom_areas_period = period;
        }
        if let Some(period) = period_from_env("VEER_SPEED_LIMITS_PERIOD_SECS") {
            config.speed_limits_period = period;
        }
        config
    }

    pub fn period_for(&self, kind: FeedKind) -> Duration {
        match kind {
            FeedKind::Eds => self.eds_period,
            FeedKind::CustomAreas => self.custom_areas_period,
            FeedKind::SpeedLimits => self.speed_limits_period,
        }
    }
}

fn period_from_env(key: &str) -> Option<Duration> {
    let secs: u64 = env::var(key).ok()?.parse().ok()?;
    (secs > 0).then(|| Duration::from_secs(secs))
}
