//! Session configuration.

use serde::{Deserialize, Serialize};

/// Configuration for job sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Deadline for the whole job (download + stitch + forward), measured
    /// from session creation. Must be larger than the stitch timeout.
    #[serde(default = "default_deadline")]
    pub deadline_ms: u64,
}

fn default_deadline() -> u64 {
    250_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline(),
        }
    }
}

impl SessionConfig {
    /// Creates a config with the given deadline.
    pub fn with_deadline_ms(deadline_ms: u64) -> Self {
        Self { deadline_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(SessionConfig::default().deadline_ms, 250_000);
    }

    #[test]
    fn test_deserialize_empty() {
        let config: SessionConfig = toml::from_str("").unwrap();
        assert_eq!(config.deadline_ms, 250_000);
    }
}
