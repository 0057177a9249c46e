//! In-memory registry of push subscriptions, keyed by endpoint URL.
//!
//! Subscriptions are lost on restart. The lock guards only synchronous map
//! operations and is never held across an await point.

use crate::core::PushSubscription;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),
}

/// A cloneable handle to the shared subscription map.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<HashMap<String, PushSubscription>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PushSubscription>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a subscription, replacing any record with the same endpoint.
    pub fn add(&self, subscription: PushSubscription) -> Result<(), RegistryError> {
        if subscription.endpoint.trim().is_empty() {
            return Err(RegistryError::InvalidSubscription(
                "Subscription endpoint is required".to_string(),
            ));
        }
        let mut map = self.lock();
        map.insert(subscription.endpoint.clone(), subscription);
        metrics::gauge!("push_subscriptions").set(map.len() as f64);
        Ok(())
    }

    /// Removes a subscription. Returns whether a record was present.
    pub fn remove(&self, endpoint: &str) -> bool {
        let mut map = self.lock();
        let removed = map.remove(endpoint).is_some();
        if removed {
            debug!(endpoint, "Removed push subscription");
            metrics::gauge!("push_subscriptions").set(map.len() as f64);
        }
        removed
    }

    /// Removes `expected` only if the stored record for its endpoint is still
    /// identical. A re-subscription that replaced the record keeps it alive.
    pub fn remove_if_unchanged(&self, expected: &PushSubscription) -> bool {
        let mut map = self.lock();
        if map.get(&expected.endpoint) != Some(expected) {
            return false;
        }
        map.remove(&expected.endpoint);
        debug!(endpoint = %expected.endpoint, "Removed push subscription");
        metrics::gauge!("push_subscriptions").set(map.len() as f64);
        true
    }

    /// Returns a snapshot of every stored subscription.
    pub fn list_all(&self) -> Vec<PushSubscription> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, endpoint: &str) -> Option<PushSubscription> {
        self.lock().get(endpoint).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
