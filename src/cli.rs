//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. The parsed `Cli` doubles as the highest-precedence `figment`
//! provider, so flags override the file and the environment.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Watches an EV charging station and notifies subscribers when it frees up.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Port for the HTTP server.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// URL of the station status endpoint.
    #[arg(long, value_name = "URL")]
    pub station_url: Option<String>,

    /// Minutes between background polls.
    #[arg(long, value_name = "MINUTES")]
    pub interval_minutes: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(port) = self.port {
            insert_nested(&mut dict, "server", "port", Value::from(port));
        }
        if let Some(url) = &self.station_url {
            insert_nested(&mut dict, "station", "url", Value::from(url.clone()));
        }
        if let Some(minutes) = self.interval_minutes {
            insert_nested(&mut dict, "poll", "interval_minutes", Value::from(minutes));
        }
        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

fn insert_nested(dict: &mut Dict, section: &str, key: &str, value: Value) {
    let entry = dict
        .entry(section.to_string())
        .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
    if let Value::Dict(_, inner) = entry {
        inner.insert(key.to_string(), value);
    }
}
