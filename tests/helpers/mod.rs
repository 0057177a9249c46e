#![allow(dead_code)]
//! Shared fakes and an application harness for integration tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use evwatch::{
    app::App,
    config::Config,
    core::{NotificationPayload, PushSender, PushSubscription, StationSnapshot, StatusSource},
    notification::DeliveryError,
    registry::SubscriptionRegistry,
    station::FetchError,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const INDEX_HTML: &str = "<!doctype html><title>EV Station Monitor</title>";

/// A station that returns whatever payload the test last set.
///
/// A gated source holds every fetch until the test calls `release`.
pub struct FakeStatusSource {
    payload: Mutex<Value>,
    gate: Semaphore,
}

impl FakeStatusSource {
    pub fn open(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(payload),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        })
    }

    pub fn gated(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload: Mutex::new(payload),
            gate: Semaphore::new(0),
        })
    }

    pub fn set_status(&self, status: &str) {
        *self.payload.lock().unwrap() = json!({ "status": status });
    }

    pub fn release(&self, fetches: usize) {
        self.gate.add_permits(fetches);
    }
}

#[async_trait]
impl StatusSource for FakeStatusSource {
    async fn fetch(&self) -> Result<StationSnapshot, FetchError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        permit.forget();
        Ok(StationSnapshot {
            fetched_at: Utc::now(),
            raw_payload: self.payload.lock().unwrap().clone(),
        })
    }
}

/// Records every delivery; endpoints in `gone` answer as permanently gone.
#[derive(Default)]
pub struct RecordingPushSender {
    pub sent: Mutex<Vec<(String, NotificationPayload)>>,
    pub gone: Mutex<HashSet<String>>,
}

impl RecordingPushSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_gone(&self, endpoint: &str) {
        self.gone.lock().unwrap().insert(endpoint.to_string());
    }

    pub fn sent(&self) -> Vec<(String, NotificationPayload)> {
        self.sent.lock().unwrap().clone()
    }

    /// Polls until at least `count` deliveries were recorded.
    pub async fn wait_for(&self, count: usize, limit: Duration) -> Vec<(String, NotificationPayload)> {
        let _ = timeout(limit, async {
            while self.sent.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        self.sent()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload.clone()));
        if self.gone.lock().unwrap().contains(&subscription.endpoint) {
            return Err(DeliveryError::Gone("410 Gone".to_string()));
        }
        Ok(())
    }
}

/// A browser-shaped subscription body.
pub fn subscription_json(endpoint: &str) -> Value {
    json!({
        "endpoint": endpoint,
        "expirationTime": null,
        "keys": { "p256dh": "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM", "auth": "tBHItJI5svbpez7KI4CCXg" }
    })
}

/// Config suitable for tests: ephemeral port, no metrics.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.port = 0;
    config.station.timeout_seconds = 1;
    config
}

/// A running application instance.
pub struct TestApp {
    pub addr: SocketAddr,
    pub registry: SubscriptionRegistry,
    pub client: reqwest::Client,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<()>>,
    _public_dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shuts down the application and waits for it to terminate.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_tx.send(true)?;
        timeout(Duration::from_secs(5), self.handle).await???;
        Ok(())
    }
}

/// Builder for `TestApp`.
#[derive(Default)]
pub struct TestAppBuilder {
    config: Option<Config>,
    source: Option<Arc<dyn StatusSource>>,
    sender: Option<Arc<dyn PushSender>>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_source(mut self, source: Arc<dyn StatusSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_sender(mut self, sender: Arc<dyn PushSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub async fn start(self) -> Result<TestApp> {
        let public_dir = tempfile::tempdir()?;
        std::fs::write(public_dir.path().join("index.html"), INDEX_HTML)?;

        let mut config = self.config.unwrap_or_else(test_config);
        config.server.public_dir = public_dir.path().to_path_buf();

        let mut builder = App::builder(config);
        if let Some(source) = self.source {
            builder = builder.status_source_override(source);
        }
        if let Some(sender) = self.sender {
            builder = builder.push_sender_override(sender);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = builder.build(shutdown_rx).await?;
        let port = app.local_addr().port();
        let registry = app.registry();
        let handle = tokio::spawn(app.run());

        Ok(TestApp {
            addr: SocketAddr::from(([127, 0, 0, 1], port)),
            registry,
            client: reqwest::Client::new(),
            shutdown_tx,
            handle,
            _public_dir: public_dir,
        })
    }
}
