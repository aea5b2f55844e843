//! Driver lifecycle states
//!
//! Lifecycle: (unsubmitted) → SUBMITTED → {RUNNING, UNKNOWN} → one of
//! {FINISHED, KILLED, FAILED, ERROR, UNKNOWN}. The terminal set is the
//! conclusion check used everywhere else in this crate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cluster-reported lifecycle label for a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverState {
    /// Submitted but not yet scheduled on a worker
    Submitted,
    /// Allocated to a worker and running
    Running,
    /// Exited abnormally and not yet started running again
    Relaunching,
    /// Ran and exited cleanly
    Finished,
    /// Killed on user request
    Killed,
    /// Exited non-zero without supervision
    Failed,
    /// Unrecoverable launcher or master error
    Error,
    /// State could not be determined
    Unknown,
}

impl DriverState {
    /// True for states after which no further transition happens.
    ///
    /// `UNKNOWN` is terminal: a state that cannot be determined is
    /// treated as concluded-but-uncertain rather than retried.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DriverState::Finished
                | DriverState::Unknown
                | DriverState::Killed
                | DriverState::Failed
                | DriverState::Error
        )
    }

    /// Map a cluster-reported token to a state. Unrecognized tokens
    /// read as `Unknown`.
    pub fn parse(token: &str) -> DriverState {
        match token.trim() {
            "SUBMITTED" => DriverState::Submitted,
            "RUNNING" => DriverState::Running,
            "RELAUNCHING" => DriverState::Relaunching,
            "FINISHED" => DriverState::Finished,
            "KILLED" => DriverState::Killed,
            "FAILED" => DriverState::Failed,
            "ERROR" => DriverState::Error,
            _ => DriverState::Unknown,
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            DriverState::Submitted => "SUBMITTED",
            DriverState::Running => "RUNNING",
            DriverState::Relaunching => "RELAUNCHING",
            DriverState::Finished => "FINISHED",
            DriverState::Killed => "KILLED",
            DriverState::Failed => "FAILED",
            DriverState::Error => "ERROR",
            DriverState::Unknown => "UNKNOWN",
        };
        write!(f, "{}", token)
    }
}
