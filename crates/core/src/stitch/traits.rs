//! Trait definitions for the stitch module.

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::error::StitchError;
use super::types::{StitchOutput, StitchRequest};

/// Concatenates and re-encodes audio files.
#[async_trait]
pub trait Stitcher: Send + Sync {
    /// Returns the name of this stitcher implementation.
    fn name(&self) -> &str;

    /// Stitches the request's inputs into its output file.
    ///
    /// Fails with `StitchError::Timeout` when the configured timeout passes
    /// and with `StitchError::Cancelled` when `cancel` fires first. In both
    /// cases the partial output is removed.
    async fn stitch(
        &self,
        request: &StitchRequest,
        cancel: &CancellationToken,
    ) -> Result<StitchOutput, StitchError>;

    /// Returns the duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, StitchError>;

    /// Validates that the stitcher is properly configured and ready.
    async fn validate(&self) -> Result<(), StitchError>;
}
