//! HTTP client for the three overlay feeds.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use reqwest::Client;
use thiserror::Error;

use crate::areas::parse_custom_areas;
use crate::eds::parse_eds;
use crate::snapshot::{CustomAreaSnapshot, EdsSnapshot, SpeedLimitSnapshot};
use crate::speed_limits::parse_speed_limits;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed failures the refresh loops care to distinguish.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{feed} feed returned HTTP status {status}")]
    Status { feed: &'static str, status: u16 },
    #[error("{feed} feed payload is not parseable: {source}")]
    Json {
        feed: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Stateless HTTPS GET client for the upstream feeds.
///
/// The client holds no snapshots and mutates nothing shared; a fetch either
/// yields a fully parsed snapshot or an error the caller logs and retries
/// on the next scheduled tick.
pub struct FeedClient {
    http: Client,
    eds_url: String,
    custom_areas_url: String,
    speed_limits_url: String,
}

impl FeedClient {
    pub fn new(
        eds_url: impl Into<String>,
        custom_areas_url: impl Into<String>,
        speed_limits_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build feed HTTP client")?;
        Ok(Self {
            http,
            eds_url: eds_url.into(),
            custom_areas_url: custom_areas_url.into(),
            speed_limits_url: speed_limits_url.into(),
        })
    }

    async fn get_body(&self, feed: &'static str, url: &str) -> Result<String> {
        tracing::debug!(feed, url, "fetching feed");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("{feed} feed request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                feed,
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("{feed} feed body read failed"))?;
        tracing::debug!(feed, bytes = body.len(), "feed fetched");
        Ok(body)
    }

    pub async fn fetch_eds(&self) -> Result<EdsSnapshot> {
        let body = self.get_body("eds", &self.eds_url).await?;
        Ok(parse_eds(&body)?)
    }

    pub async fn fetch_custom_areas(&self) -> Result<CustomAreaSnapshot> {
        let body = self.get_body("custom_areas", &self.custom_areas_url).await?;
        Ok(parse_custom_areas(&body)?)
    }

    pub async fn fetch_speed_limits(&self) -> Result<SpeedLimitSnapshot> {
        let body = self.get_body("speed_limits", &self.speed_limits_url).await?;
        Ok(parse_speed_limits(&body)?)
    }
}
