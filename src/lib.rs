//! EvWatch - EV charging station availability monitor
//!
//! Polls a third-party station status endpoint, serves the result to a
//! browser client, and notifies push subscribers when the station becomes
//! available again.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod extract;
pub mod internal_metrics;
pub mod notification;
pub mod poller;
pub mod registry;
pub mod station;
pub mod task_manager;
pub mod tracker;

// Re-export core types for convenience
pub use crate::core::*;
