//! Session tracking for a single stitch job.
//!
//! The [`SessionTracker`] owns the job's [`SessionState`] and
//! [`SessionMetrics`]:
//! - **Queued** on creation, **Running** once started
//! - Exactly one terminal transition: Stopped, Complete, Error or TimedOut
//! - A deadline watchdog times the job out and cancels in-flight work

mod config;
mod tracker;
mod types;

pub use config::SessionConfig;
pub use tracker::SessionTracker;
pub use types::{SessionError, SessionMetrics, SessionState};
