use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - At least one download may run at a time
/// - min_integrity lies in [0, 1)
/// - Stitch timeout is not 0
/// - The job deadline outlasts the stitch timeout
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Download validation
    if config.download.max_concurrent_downloads == 0 {
        return Err(ConfigError::ValidationError(
            "download.max_concurrent_downloads cannot be 0".to_string(),
        ));
    }

    let min_integrity = config.download.min_integrity;
    if !(0.0..1.0).contains(&min_integrity) {
        return Err(ConfigError::ValidationError(format!(
            "download.min_integrity must be in [0, 1), got {}",
            min_integrity
        )));
    }

    // Stitch validation
    if config.stitch.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "stitch.timeout_ms cannot be 0".to_string(),
        ));
    }

    // Session validation
    if config.session.deadline_ms <= config.stitch.timeout_ms {
        return Err(ConfigError::ValidationError(format!(
            "session.deadline_ms ({}) must be greater than stitch.timeout_ms ({})",
            config.session.deadline_ms, config.stitch.timeout_ms
        )));
    }

    Ok(())
}
