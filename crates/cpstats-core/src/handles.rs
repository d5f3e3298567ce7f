use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One tracked account: which platform, which handle, and optional
/// per-deployment overrides of the registry defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleConfig {
    pub platform: String,
    pub username: String,
    /// Replaces the registry's page URL template.
    #[serde(default)]
    pub endpoint_template: Option<String>,
    /// Replaces the exclusive sanity ceiling for this platform only.
    #[serde(default)]
    pub max_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandlesFile {
    pub handles: Vec<HandleConfig>,
}

impl HandlesFile {
    /// Case-insensitive lookup by platform name.
    #[must_use]
    pub fn find(&self, platform: &str) -> Option<&HandleConfig> {
        self.handles
            .iter()
            .find(|h| h.platform.eq_ignore_ascii_case(platform))
    }
}

/// Load and validate the handles configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_handles(path: &Path) -> Result<HandlesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::HandlesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_handles(&content)
}

/// Parse and validate handles YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_handles(content: &str) -> Result<HandlesFile, ConfigError> {
    let handles_file: HandlesFile = serde_yaml::from_str(content)?;
    validate_handles(&handles_file)?;
    Ok(handles_file)
}

fn validate_handles(handles_file: &HandlesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for handle in &handles_file.handles {
        if handle.platform.trim().is_empty() {
            return Err(ConfigError::Validation(
                "platform name must be non-empty".to_string(),
            ));
        }

        if handle.username.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "platform '{}' has an empty username",
                handle.platform
            )));
        }

        if !seen.insert(handle.platform.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate platform: '{}'",
                handle.platform
            )));
        }

        if handle.max_count.is_some_and(|max| max < 2) {
            return Err(ConfigError::Validation(format!(
                "platform '{}' has max_count below 2",
                handle.platform
            )));
        }
    }

    Ok(())
}
