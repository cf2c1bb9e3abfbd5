use serde::{Deserialize, Serialize};

pub use crate::download::DownloadConfig;
pub use crate::session::SessionConfig;
pub use crate::stitch::StitchConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub stitch: StitchConfig,
    #[serde(default)]
    pub session: SessionConfig,
}
