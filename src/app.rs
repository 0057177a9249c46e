//! The main application logic, decoupled from the entry point.

use crate::{
    api::{self, AppState},
    config::Config,
    core::{PushSender, StatusSource},
    internal_metrics::MetricsBuilder,
    notification::{Notifier, WebPushSender},
    poller::Poller,
    registry::SubscriptionRegistry,
    station::StationClient,
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

/// How long running tasks get to wind down after the shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A handle to the running application, containing all its task handles.
pub struct App {
    task_manager: TaskManager,
    local_addr: SocketAddr,
    metrics_addr: Option<SocketAddr>,
    registry: SubscriptionRegistry,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the HTTP server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// The subscription registry shared by the API and the notifier.
    pub fn registry(&self) -> SubscriptionRegistry {
        self.registry.clone()
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        while !*shutdown_rx.borrow_and_update() {
            if shutdown_rx.changed().await.is_err() {
                break;
            }
        }
        info!("Shutdown signal received. Waiting for tasks to complete...");

        let failures = self.task_manager.shutdown(SHUTDOWN_GRACE).await;
        if failures > 0 {
            error!(failures, "Some tasks did not shut down cleanly");
        }
        Ok(())
    }
}

/// Flips the shutdown channel once `signal` resolves.
///
/// If the signal handler cannot be installed the app keeps running; the
/// sender is held for the life of the task so receivers never see a close.
pub async fn forward_shutdown_signal<F>(signal: F, shutdown_tx: watch::Sender<bool>)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown signal received. Shutting down gracefully...");
            let _ = shutdown_tx.send(true);
        }
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C; graceful shutdown unavailable");
            std::future::pending::<()>().await;
        }
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// swap out the two outbound seams.
pub struct AppBuilder {
    config: Config,
    status_source_override: Option<Arc<dyn StatusSource>>,
    push_sender_override: Option<Arc<dyn PushSender>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            status_source_override: None,
            push_sender_override: None,
        }
    }

    /// Overrides the station endpoint client for testing.
    pub fn status_source_override(mut self, source: Arc<dyn StatusSource>) -> Self {
        self.status_source_override = Some(source);
        self
    }

    /// Overrides the push delivery backend for testing.
    ///
    /// Push is reported as enabled to browsers whenever a sender is present.
    pub fn push_sender_override(mut self, sender: Arc<dyn PushSender>) -> Self {
        self.push_sender_override = Some(sender);
        self
    }

    /// Builds and initializes all application components, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Metrics
        // =========================================================================
        let metrics_addr = match MetricsBuilder::new(config.metrics.clone())
            .build(task_manager.get_shutdown_rx())
            .await?
        {
            Some((server, addr)) => {
                info!(%addr, "Metrics server listening");
                task_manager.spawn("MetricsServer", server.run());
                Some(addr)
            }
            None => None,
        };

        // =========================================================================
        // 2. Outbound collaborators
        // =========================================================================
        let source: Arc<dyn StatusSource> = match self.status_source_override {
            Some(source) => source,
            None => Arc::new(StationClient::from_config(&config.station)),
        };

        let sender: Option<Arc<dyn PushSender>> = match self.push_sender_override {
            Some(sender) => Some(sender),
            None => WebPushSender::from_config(&config.push)?
                .map(|sender| Arc::new(sender) as Arc<dyn PushSender>),
        };
        let push_enabled = sender.is_some();

        // =========================================================================
        // 3. Shared state and the poll loop
        // =========================================================================
        let registry = SubscriptionRegistry::new();
        let notifier = Notifier::new(registry.clone(), sender, config.push.target_url.clone());
        let poller = Poller::new(source.clone(), notifier, config.poll.interval());
        task_manager.spawn("Poller", poller.run(task_manager.get_shutdown_rx()));

        // =========================================================================
        // 4. HTTP server
        // =========================================================================
        let state = AppState {
            source,
            registry: registry.clone(),
            push_enabled,
            public_key: config.push.public_key.clone().unwrap_or_default(),
        };
        let router = api::router(state, &config.server.public_dir);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;
        let local_addr = listener.local_addr()?;

        let mut server_shutdown_rx = task_manager.get_shutdown_rx();
        task_manager.spawn("HttpServer", async move {
            let shutdown = async move {
                let _ = server_shutdown_rx.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
            info!("HTTP server finished.");
        });

        info!(%local_addr, "EV station monitor listening");

        Ok(App {
            task_manager,
            local_addr,
            metrics_addr,
            registry,
        })
    }
}
