//! Web Push delivery with VAPID authentication.

use crate::config::PushConfig;
use crate::core::{NotificationPayload, PushSender, PushSubscription};
use crate::notification::DeliveryError;
use async_trait::async_trait;
use tracing::{debug, instrument};
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

/// Seconds the push service may hold a message for an offline device.
const MESSAGE_TTL_SECONDS: u32 = 60 * 60;

/// Delivers payloads through the subscriber's push service.
pub struct WebPushSender {
    client: IsahcWebPushClient,
    private_key: String,
    subject: String,
}

impl WebPushSender {
    /// Creates a new `WebPushSender` from a URL-safe base64 private key.
    pub fn new(private_key: impl Into<String>, subject: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: IsahcWebPushClient::new()?,
            private_key: private_key.into(),
            subject: subject.into(),
        })
    }

    /// Builds a sender when the key pair is configured, `None` otherwise.
    pub fn from_config(config: &PushConfig) -> anyhow::Result<Option<Self>> {
        if !config.is_enabled() {
            return Ok(None);
        }
        let private_key = config.private_key.clone().unwrap_or_default();
        Ok(Some(Self::new(private_key, config.subject.clone())?))
    }

    fn build_message(
        &self,
        subscription: &PushSubscription,
        body: &[u8],
    ) -> Result<web_push::WebPushMessage, WebPushError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.as_str(),
            subscription.keys.p256dh.as_str(),
            subscription.keys.auth.as_str(),
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(&self.private_key, URL_SAFE_NO_PAD, &info)?;
        signature.add_claim("sub", self.subject.as_str());

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_ttl(MESSAGE_TTL_SECONDS);
        builder.set_payload(ContentEncoding::Aes128Gcm, body);
        builder.set_vapid_signature(signature.build()?);
        builder.build()
    }
}

/// Maps a push service error onto the keep/prune decision.
pub fn classify_error(err: WebPushError) -> DeliveryError {
    match err {
        WebPushError::EndpointNotValid { .. } | WebPushError::EndpointNotFound { .. } => {
            DeliveryError::Gone(err.to_string())
        }
        other => DeliveryError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    #[instrument(skip_all, fields(endpoint = %subscription.endpoint))]
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;
        let message = self
            .build_message(subscription, &body)
            .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;

        self.client.send(message).await.map_err(classify_error)?;
        debug!("Push message accepted");
        Ok(())
    }
}
