//! Error types for the download module.

use thiserror::Error;

/// Errors for a single segment download. Never fatal for the batch.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    /// The segment URL could not be parsed.
    #[error("Invalid segment URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Segment {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The request timed out.
    #[error("Segment request timed out: {url}")]
    Timeout { url: String },

    /// Connection or body stream failure.
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The body ended before the advertised length was received.
    #[error("Incomplete download: expected {expected} bytes, received {received}")]
    Incomplete { expected: u64, received: u64 },

    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Maps a reqwest error for the given URL.
    pub fn transport(url: impl Into<String>, err: reqwest::Error) -> Self {
        let url = url.into();
        if err.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Transport {
                url,
                reason: err.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// The batch did not reach the required success rate.
#[derive(Debug, Clone, Error)]
#[error(
    "Failed download integrity test, success rate = {success_rate} ({succeeded}/{total}, required > {min_integrity})"
)]
pub struct IntegrityError {
    pub success_rate: f64,
    pub succeeded: usize,
    pub total: usize,
    pub min_integrity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DownloadError::HttpStatus {
            url: "http://cdn/a.mp3".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "Segment http://cdn/a.mp3 returned HTTP 404");

        let err = IntegrityError {
            success_rate: 0.6,
            succeeded: 3,
            total: 5,
            min_integrity: 0.6,
        };
        assert!(err.to_string().contains("success rate = 0.6"));
        assert!(err.to_string().contains("3/5"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DownloadError = io.into();
        assert!(matches!(err, DownloadError::Io(_)));
    }
}
