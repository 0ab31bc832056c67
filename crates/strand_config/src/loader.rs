//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::StrandConfig;
use std::path::Path;

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "strand.toml";

/// Loads and validates a `strand.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<StrandConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `strand.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<StrandConfig, ConfigError> {
    let config: StrandConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &StrandConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::Missing("project.name"));
    }
    if config.project.entry.is_empty() {
        return Err(ConfigError::Missing("project.entry"));
    }
    if let Some(bad) = config
        .system
        .embedded
        .iter()
        .find(|uri| !uri.starts_with("std:"))
    {
        return Err(ConfigError::Invalid(format!(
            "embedded library '{bad}' is not a std: library"
        )));
    }
    if config.output.dir.is_empty() {
        return Err(ConfigError::Missing("output.dir"));
    }
    Ok(())
}
