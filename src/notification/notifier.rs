//! Scatter/gather delivery of one notification to every registered subscriber.

use crate::core::{NotificationPayload, PushSender, PushSubscription};
use crate::notification::DeliveryError;
use crate::registry::SubscriptionRegistry;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Summary of one dispatch round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Recoverable failures; those subscriptions were kept.
    pub failed: usize,
    /// Endpoints removed because the push service reported them gone.
    pub pruned: Vec<String>,
}

/// Sends notifications to all subscriptions and prunes dead endpoints.
pub struct Notifier {
    registry: SubscriptionRegistry,
    sender: Option<Arc<dyn PushSender>>,
    target_url: String,
}

impl Notifier {
    /// Creates a new `Notifier`. A `None` sender disables push entirely.
    pub fn new(
        registry: SubscriptionRegistry,
        sender: Option<Arc<dyn PushSender>>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            sender,
            target_url: target_url.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Notifies every current subscriber that the station is available.
    ///
    /// All deliveries run concurrently and are awaited before any endpoint
    /// is removed. Without a configured sender this is a silent no-op.
    #[instrument(skip(self))]
    pub async fn notify(&self, status_label: &str) -> DispatchReport {
        let Some(sender) = &self.sender else {
            debug!("Push delivery not configured; skipping dispatch");
            return DispatchReport::default();
        };

        let subscriptions = self.registry.list_all();
        if subscriptions.is_empty() {
            debug!("No push subscriptions registered");
            return DispatchReport::default();
        }

        let payload = NotificationPayload::station_available(status_label, &self.target_url);
        metrics::counter!("notifications_dispatched_total").increment(1);
        info!(count = subscriptions.len(), "Dispatching availability notification");

        let outcomes = join_all(
            subscriptions
                .iter()
                .map(|subscription| deliver(sender.as_ref(), subscription, &payload)),
        )
        .await;

        let mut report = DispatchReport {
            attempted: subscriptions.len(),
            ..Default::default()
        };
        let mut gone = Vec::new();
        for (subscription, outcome) in subscriptions.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_permanent() => gone.push(subscription),
                Err(_) => report.failed += 1,
            }
        }

        // Only the exact record that failed is removed; a fresh re-subscription survives.
        for subscription in gone {
            if self.registry.remove_if_unchanged(subscription) {
                metrics::counter!("subscriptions_pruned_total").increment(1);
                info!(endpoint = %subscription.endpoint, "Pruned expired push subscription");
                report.pruned.push(subscription.endpoint.clone());
            } else {
                debug!(endpoint = %subscription.endpoint, "Subscription replaced during dispatch; kept");
            }
        }

        report
    }
}

async fn deliver(
    sender: &dyn PushSender,
    subscription: &PushSubscription,
    payload: &NotificationPayload,
) -> Result<(), DeliveryError> {
    let result = sender.send(subscription, payload).await;
    let outcome = match &result {
        Ok(()) => "delivered",
        Err(DeliveryError::Gone(_)) => "gone",
        Err(DeliveryError::Unavailable(reason)) => {
            warn!(endpoint = %subscription.endpoint, reason = %reason, "Push delivery failed");
            "unavailable"
        }
    };
    metrics::counter!("push_deliveries_total", "outcome" => outcome).increment(1);
    result
}
