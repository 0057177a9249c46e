//! Tracks the station's availability across polls and detects rising edges.

use serde::Serialize;
use std::fmt;

/// The last known availability of the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Unknown,
    Available,
    Occupied,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Unknown => write!(f, "unknown"),
            Availability::Available => write!(f, "available"),
            Availability::Occupied => write!(f, "occupied"),
        }
    }
}

/// Classifies a status label.
///
/// Anything whose lower-cased form is not exactly `"occupied"` counts as
/// available, including a missing label.
pub fn classify(label: Option<&str>) -> Availability {
    match label {
        Some(label) if label.to_lowercase() == "occupied" => Availability::Occupied,
        _ => Availability::Available,
    }
}

/// What a single observation did to the tracked state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved from unknown/occupied to available. Notify.
    RisingEdge,
    /// Still available; suppressed.
    StillAvailable,
    /// Observed occupied.
    Occupied,
    /// No label was observed; state untouched.
    Ignored,
}

impl Transition {
    pub fn is_rising_edge(self) -> bool {
        matches!(self, Transition::RisingEdge)
    }
}

/// Holds the one piece of state that survives between poll ticks.
///
/// Starts `Unknown` and only moves once a concrete label is observed.
#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    state: Availability,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Availability {
        self.state
    }

    /// Applies the latest observed label and reports the resulting transition.
    pub fn observe(&mut self, label: Option<&str>) -> Transition {
        if label.is_none() {
            return Transition::Ignored;
        }

        match classify(label) {
            Availability::Occupied => {
                self.state = Availability::Occupied;
                Transition::Occupied
            }
            _ if self.state == Availability::Available => Transition::StillAvailable,
            _ => {
                self.state = Availability::Available;
                Transition::RisingEdge
            }
        }
    }
}
