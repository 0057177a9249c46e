//! Configuration management for EvWatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer compiled defaults, an optional `evwatch.toml` file,
//! `EVWATCH_`-prefixed environment variables, the plain variable names used
//! by earlier deployments (`PORT`, `STATION_URL`, ...), and finally the
//! command line.

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "evwatch.toml";

/// Longest accepted poll period: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Inbound HTTP server settings.
    pub server: ServerConfig,
    /// The station endpoint being watched.
    pub station: StationConfig,
    /// Poll loop settings.
    pub poll: PollConfig,
    /// Web Push settings.
    pub push: PushConfig,
    /// Prometheus metrics settings.
    pub metrics: MetricsConfig,
}

/// Inbound HTTP server settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// The TCP port to listen on (all interfaces).
    pub port: u16,
    /// Directory holding the browser client.
    pub public_dir: PathBuf,
}

/// The station endpoint being watched.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StationConfig {
    /// URL of the third-party station status document.
    pub url: String,
    /// Upper bound on a single fetch, in seconds.
    pub timeout_seconds: u64,
    /// The User-Agent sent upstream.
    pub user_agent: String,
}

/// Poll loop settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    /// Minutes between background polls.
    pub interval_minutes: u64,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

/// Web Push (VAPID) settings. Push is enabled only when both keys are set.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PushConfig {
    /// URL-safe base64 VAPID public key, handed to browsers.
    pub public_key: Option<String>,
    /// URL-safe base64 VAPID private key.
    pub private_key: Option<String>,
    /// Contact URI placed in the VAPID `sub` claim.
    pub subject: String,
    /// Page opened when a notification is clicked.
    pub target_url: String,
}

impl PushConfig {
    pub fn is_enabled(&self) -> bool {
        let present = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.trim().is_empty());
        present(&self.public_key) && present(&self.private_key)
    }
}

/// Prometheus metrics settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `/metrics` on `listen_address`.
    pub enabled: bool,
    pub listen_address: SocketAddr,
}

impl Config {
    /// Loads the configuration by layering every source in precedence order.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::figment(&config_path, cli).extract::<Config>()?.validated()
    }

    /// Builds the layered `Figment` without extracting it.
    pub fn figment(config_path: &Path, cli: &Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. EVWATCH_PUSH__SUBJECT=mailto:me@example.com
            .merge(Env::prefixed("EVWATCH_").split("__"))
            .merge(legacy_env())
            .merge(cli.clone())
    }

    fn validated(self) -> Result<Self> {
        if self.poll.interval_minutes == 0 {
            bail!("poll.interval_minutes must be greater than zero");
        }
        if self.poll.interval_minutes > MAX_INTERVAL_MINUTES {
            bail!(
                "poll.interval_minutes must be at most {} (one week), got {}",
                MAX_INTERVAL_MINUTES,
                self.poll.interval_minutes
            );
        }
        if self.station.timeout_seconds == 0 {
            bail!("station.timeout_seconds must be greater than zero");
        }
        Ok(self)
    }
}

/// Unprefixed variables understood for compatibility with existing deployments.
fn legacy_env() -> Env {
    Env::raw()
        .only(&[
            "PORT",
            "STATION_URL",
            "POLL_INTERVAL_MINUTES",
            "VAPID_PUBLIC_KEY",
            "VAPID_PRIVATE_KEY",
            "VAPID_SUBJECT",
        ])
        .map(|key| {
            let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                "PORT" => "server.port",
                "STATION_URL" => "station.url",
                "POLL_INTERVAL_MINUTES" => "poll.interval_minutes",
                "VAPID_PUBLIC_KEY" => "push.public_key",
                "VAPID_PRIVATE_KEY" => "push.private_key",
                "VAPID_SUBJECT" => "push.subject",
                _ => return key.into(),
            };
            mapped.into()
        })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig::default(),
            station: StationConfig::default(),
            poll: PollConfig::default(),
            push: PushConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            public_dir: PathBuf::from("public"),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            url: "https://charge.virtaglobal.com/stations/6224".to_string(),
            timeout_seconds: 15,
            user_agent: "EV-Station-Monitor/1.0 (+https://example.com)".to_string(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 10,
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            private_key: None,
            subject: "mailto:admin@example.com".to_string(),
            target_url: "/".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: SocketAddr::from(([127, 0, 0, 1], 9898)),
        }
    }
}
