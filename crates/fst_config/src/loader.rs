//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::TraceConfig;
use fst_common::block::VERSION_SIZE;
use std::path::Path;

/// Loads and validates a trace configuration file.
pub fn load_config(path: &Path) -> Result<TraceConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a trace configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<TraceConfig, ConfigError> {
    let config: TraceConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks values that deserialize cleanly but cannot be honoured.
fn validate_config(config: &TraceConfig) -> Result<(), ConfigError> {
    let writer = &config.writer;
    if writer.break_size == 0 {
        return Err(ConfigError::ValidationError(
            "writer.break_size must be non-zero".to_string(),
        ));
    }
    if writer.version.len() >= VERSION_SIZE {
        return Err(ConfigError::ValidationError(format!(
            "writer.version is {} bytes, the header holds at most {}",
            writer.version.len(),
            VERSION_SIZE - 1
        )));
    }
    Ok(())
}
