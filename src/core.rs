//! Core domain types and service traits for EvWatch
//!
//! This module defines the data that flows through one poll cycle and the
//! trait contracts at the two outbound seams: the station status endpoint and
//! the push delivery service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notification::DeliveryError;
use crate::station::FetchError;

/// One successful observation of the station endpoint.
///
/// Produced fresh on every poll and owned by the cycle that fetched it.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    /// When the response body was received.
    pub fetched_at: DateTime<Utc>,
    /// The decoded JSON body, shape unknown.
    pub raw_payload: Value,
}

/// Human-readable status derived from a [`StationSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedStatus {
    /// The station-level status label, if one of the known fields was present.
    pub status_label: Option<String>,
    /// Comma-separated connector summary, or a placeholder dash.
    pub connectors_summary: String,
}

impl ExtractedStatus {
    /// The label shown to people; `"unknown"` when nothing was found.
    pub fn display_status(&self) -> &str {
        self.status_label.as_deref().unwrap_or("unknown")
    }
}

/// Key material attached to a browser push subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SubscriptionKeys {
    #[serde(default)]
    pub p256dh: String,
    #[serde(default)]
    pub auth: String,
}

/// A browser push subscription as produced by `PushManager.subscribe()`.
///
/// The endpoint URL is the unique key; everything else is opaque delivery
/// metadata that is only handed back to the push service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<Value>,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

/// The JSON document delivered to every subscriber on a rising edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    pub tag: String,
}

impl NotificationPayload {
    /// Builds the "station available" notification for a status label.
    pub fn station_available(status_label: &str, target_url: &str) -> Self {
        Self {
            title: "EV Station available".to_string(),
            body: format!("Station status changed to \"{}\".", status_label),
            url: target_url.to_string(),
            tag: "ev-station-availability".to_string(),
        }
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Fetches the current station status document.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Performs exactly one bounded request, without retries.
    ///
    /// # Returns
    /// * `Ok(StationSnapshot)` on a 2xx response carrying JSON
    /// * `Err(FetchError)` classified as timeout, non-2xx, transport or body failure
    async fn fetch(&self) -> Result<StationSnapshot, FetchError>;
}

/// Delivers a payload to a single push subscription.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Sends one payload to one subscriber.
    ///
    /// # Returns
    /// * `Ok(())` if the push service accepted the message
    /// * `Err(DeliveryError::Gone)` if the endpoint no longer exists
    /// * `Err(DeliveryError::Unavailable)` for anything worth retrying next time
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError>;
}
