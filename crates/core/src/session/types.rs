//! Types for session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Queued,
    Running,
    Stopped,
    Complete,
    Error,
    TimedOut,
}

impl SessionState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Stopped | Self::Complete | Self::Error | Self::TimedOut
        )
    }

    /// Returns the state name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics recorded for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub job_id: String,
    pub state: SessionState,
    pub start_time: DateTime<Utc>,
    /// Set once, on the terminal transition.
    pub end_time: Option<DateTime<Utc>>,
    pub duration_millis: u64,
    pub duration_mins: f64,
    /// Fraction of segments downloaded, in `[0, 1]`.
    pub download_success_rate: Option<f64>,
    /// Failed segments: segment id -> source URL.
    pub download_failures: BTreeMap<String, String>,
    pub encoding_duration_millis: Option<u64>,
    pub output_size_bytes: Option<u64>,
    pub output_duration_secs: Option<f64>,
    pub terminal_error: Option<String>,
}

impl SessionMetrics {
    pub(crate) fn new(job_id: String, start_time: DateTime<Utc>) -> Self {
        Self {
            job_id,
            state: SessionState::Queued,
            start_time,
            end_time: None,
            duration_millis: 0,
            duration_mins: 0.0,
            download_success_rate: None,
            download_failures: BTreeMap::new(),
            encoding_duration_millis: None,
            output_size_bytes: None,
            output_duration_secs: None,
            terminal_error: None,
        }
    }
}

/// Errors raised by the session tracker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The session already reached a terminal state.
    #[error("session already finalized in state {state}")]
    AlreadyFinalized { state: SessionState },

    /// The metric has already been recorded.
    #[error("{field} already recorded")]
    AlreadyRecorded { field: &'static str },

    /// Encoding time recorded before the download success rate.
    #[error("{field} recorded before {requires}")]
    OutOfOrder {
        field: &'static str,
        requires: &'static str,
    },

    /// The requested transition is not allowed from the current state.
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}
