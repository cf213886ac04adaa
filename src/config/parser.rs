//! Generic YAML configuration parsing.
//!
//! Errors carry the file path and surface as [`KpmError::ConfigError`] so the
//! CLI can point at the offending file.

use anyhow::Result;
use std::path::Path;

use crate::core::KpmError;

/// Parse a YAML configuration file into the specified type.
///
/// Strictness (unknown keys) is up to the target type's serde attributes.
/// An empty file decodes as if it were an empty mapping.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path).map_err(|e| KpmError::ConfigError {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    let content = if content.trim().is_empty() { "{}" } else { content.as_str() };
    let config: T = serde_yaml::from_str(content).map_err(|e| KpmError::ConfigError {
        message: format!("Failed to parse config file {}: {e}", path.display()),
    })?;

    Ok(config)
}
