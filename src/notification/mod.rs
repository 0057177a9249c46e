//! Fan-out of "station available" notifications to push subscribers.
//!
//! The [`Notifier`] gathers delivery outcomes from every subscriber before it
//! prunes the registry, so the registry is never mutated mid-iteration.
//! Delivery itself sits behind the [`crate::core::PushSender`] trait; the
//! production implementation speaks Web Push with VAPID (see [`webpush`]).

pub mod notifier;
pub mod webpush;

pub use notifier::{DispatchReport, Notifier};
pub use webpush::WebPushSender;

use thiserror::Error;

/// The outcome of a failed delivery to one subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The push service reported the endpoint as gone (404/410).
    #[error("push endpoint is gone: {0}")]
    Gone(String),
    /// Any other failure; the subscription is kept.
    #[error("push delivery failed: {0}")]
    Unavailable(String),
}

impl DeliveryError {
    /// Whether the subscription should be dropped from the registry.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::Gone(_))
    }
}
