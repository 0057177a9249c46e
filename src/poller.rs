//! The background poll loop: fetch → extract → track → notify, once per tick.
//!
//! The loop owns the [`AvailabilityTracker`], so availability state lives
//! exactly as long as the poller task. Fetch failures are logged and the
//! next tick simply tries again.

use crate::core::{ExtractedStatus, StatusSource};
use crate::extract::extract;
use crate::notification::{DispatchReport, Notifier};
use crate::station::FetchError;
use crate::tracker::{Availability, AvailabilityTracker, Transition};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

/// What one tick observed and did.
#[derive(Debug)]
pub struct TickOutcome {
    pub status: ExtractedStatus,
    pub transition: Transition,
    /// Present only when the tick was a rising edge.
    pub dispatch: Option<DispatchReport>,
}

/// Drives the watcher at a fixed period.
pub struct Poller {
    source: Arc<dyn StatusSource>,
    notifier: Notifier,
    tracker: AvailabilityTracker,
    interval: Duration,
}

impl Poller {
    /// Creates a new `Poller` with a fresh `Unknown` availability state.
    pub fn new(source: Arc<dyn StatusSource>, notifier: Notifier, interval: Duration) -> Self {
        Self {
            source,
            notifier,
            tracker: AvailabilityTracker::new(),
            interval,
        }
    }

    pub fn availability(&self) -> Availability {
        self.tracker.state()
    }

    /// Runs one poll cycle. Each step waits for the previous one.
    #[instrument(skip(self))]
    pub async fn tick(&mut self) -> Result<TickOutcome, FetchError> {
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => {
                metrics::counter!("station_polls_total", "outcome" => "ok").increment(1);
                snapshot
            }
            Err(e) => {
                metrics::counter!("station_polls_total", "outcome" => e.outcome()).increment(1);
                return Err(e);
            }
        };

        let status = extract(&snapshot.raw_payload);
        let transition = self.tracker.observe(status.status_label.as_deref());
        info!(
            status = status.display_status(),
            connectors = %status.connectors_summary,
            availability = %self.tracker.state(),
            fetched_at = %snapshot.fetched_at.to_rfc3339(),
            "Station polled"
        );

        let dispatch = if transition.is_rising_edge() {
            info!("Station became available; notifying subscribers");
            Some(self.notifier.notify(status.display_status()).await)
        } else {
            debug!(?transition, "No notification needed");
            None
        };

        Ok(TickOutcome {
            status,
            transition,
            dispatch,
        })
    }

    /// Polls until the shutdown signal flips. The first tick fires immediately.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "Poller started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Poller received shutdown signal.");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, kind = e.name(), "Poll failed; will retry next tick");
                    }
                }
            }
        }
        info!("Poller finished.");
    }
}
