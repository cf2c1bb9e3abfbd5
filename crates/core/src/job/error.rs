//! Error types for the job module.

use thiserror::Error;

use crate::download::IntegrityError;
use crate::session::SessionError;
use crate::stitch::StitchError;

/// Errors that end a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// Too few segments downloaded.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Stitching failed or timed out.
    #[error(transparent)]
    Stitch(#[from] StitchError),

    /// Forwarding the stitched file to the sink failed.
    #[error("Failed to write stitched audio to sink: {0}")]
    Sink(#[source] std::io::Error),

    /// The job deadline passed.
    #[error("Job timed out after {deadline_ms} ms")]
    TimedOut { deadline_ms: u64 },

    /// The session was stopped while the job was running.
    #[error("Job stopped")]
    Stopped,

    /// The session rejected a transition.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Work directory I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_message_is_preserved() {
        let err: JobError = IntegrityError {
            success_rate: 0.6,
            succeeded: 3,
            total: 5,
            min_integrity: 0.6,
        }
        .into();
        assert!(err.to_string().contains("success rate = 0.6"));
    }

    #[test]
    fn test_timeout_variants_are_distinct() {
        let job = JobError::TimedOut { deadline_ms: 250_000 };
        let stitch: JobError = StitchError::Timeout { timeout_ms: 180_000 }.into();
        assert_eq!(job.to_string(), "Job timed out after 250000 ms");
        assert_eq!(stitch.to_string(), "Stitch timed out after 180000 ms");
    }
}
