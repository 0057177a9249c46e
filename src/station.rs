//! HTTP client for the third-party charging station status endpoint.

use crate::config::StationConfig;
use crate::core::{StationSnapshot, StatusSource};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

const ACCEPT_HEADER: &str = "application/json, text/plain, */*";

/// Failure modes of a single station fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete within the configured bound.
    #[error("station request timed out after {0:?}")]
    Timeout(Duration),
    /// The station answered with a non-2xx status.
    #[error("station responded with {status} {status_text}")]
    StationUnreachable {
        status: u16,
        status_text: String,
        body: String,
    },
    /// The request failed below the HTTP layer.
    #[error("transport error: {0}")]
    Transport(String),
    /// A 2xx response whose body was not JSON.
    #[error("station returned a malformed body: {0}")]
    MalformedBody(String),
}

impl FetchError {
    /// A stable name for the error kind, used in API responses and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "TimeoutError",
            FetchError::StationUnreachable { .. } => "StationUnreachable",
            FetchError::Transport(_) => "TransportError",
            FetchError::MalformedBody(_) => "MalformedBody",
        }
    }

    /// The metrics label for this outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::StationUnreachable { .. } => "unreachable",
            FetchError::Transport(_) => "transport",
            FetchError::MalformedBody(_) => "malformed",
        }
    }
}

/// Fetches the station status document with a bounded timeout.
#[derive(Debug, Clone)]
pub struct StationClient {
    client: reqwest::Client,
    url: String,
    user_agent: String,
    timeout: Duration,
}

impl StationClient {
    /// Creates a new `StationClient`.
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// Creates a client from the `[station]` configuration section.
    pub fn from_config(config: &StationConfig) -> Self {
        Self::new(
            config.url.clone(),
            config.user_agent.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_inner(&self) -> Result<StationSnapshot, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, ACCEPT_HEADER)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::StationUnreachable {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let raw_payload: Value = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::MalformedBody(e.to_string()))?;

        Ok(StationSnapshot {
            fetched_at: Utc::now(),
            raw_payload,
        })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl StatusSource for StationClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<StationSnapshot, FetchError> {
        let start = Instant::now();
        // The outer timeout covers the body read as well as the headers.
        let result = match tokio::time::timeout(self.timeout, self.fetch_inner()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };
        metrics::histogram!("station_fetch_duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => debug!("Fetched station status"),
            Err(e) => warn!(error = %e, "Station fetch failed"),
        }
        result
    }
}
