pub mod app_config;
pub mod config;
pub mod handles;
pub mod platforms;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use handles::{load_handles, parse_handles, HandleConfig, HandlesFile};
pub use platforms::{
    expand_template, ApiExtraction, ApiRequest, ApiSpec, PatternSpec, PlatformSpec, RatingSpec,
    SanityBounds,
};

/// Provenance of a persisted count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    Automatic,
    Manual,
}

impl std::fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateMode::Automatic => write!(f, "automatic"),
            UpdateMode::Manual => write!(f, "manual"),
        }
    }
}

/// Contest rating snapshot for platforms that publish one. Every field is
/// optional: unrated accounts report no rating or rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub current: Option<i64>,
    pub max: Option<i64>,
    pub rank: Option<String>,
    pub max_rank: Option<String>,
}

impl Rating {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
            && self.max.is_none()
            && self.rank.is_none()
            && self.max_rank.is_none()
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let or_dash = |v: Option<String>| v.unwrap_or_else(|| "\u{2014}".to_string());
        write!(
            f,
            "{} (max {}), {} (max {})",
            or_dash(self.current.map(|r| r.to_string())),
            or_dash(self.max.map(|r| r.to_string())),
            or_dash(self.rank.clone()),
            or_dash(self.max_rank.clone()),
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read handles file {path}: {source}")]
    HandlesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse handles file: {0}")]
    HandlesFileParse(#[from] serde_yaml::Error),

    #[error("handles validation failed: {0}")]
    Validation(String),
}
