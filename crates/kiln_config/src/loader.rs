//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::WorkerConfig;
use std::path::Path;

/// Loads and validates a worker configuration file.
pub fn load_config(path: &Path) -> Result<WorkerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a worker configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<WorkerConfig, ConfigError> {
    let config: WorkerConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that names are usable and values are consistent.
fn validate_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.entry.class.is_empty() {
        return Err(ConfigError::MissingField("entry.class".to_string()));
    }
    if !is_java_identifier(&config.entry.class) {
        return Err(ConfigError::ValidationError(format!(
            "entry.class '{}' is not a valid class name",
            config.entry.class
        )));
    }
    if config.entry.method.is_empty() {
        return Err(ConfigError::MissingField("entry.method".to_string()));
    }
    if !is_java_identifier(&config.entry.method) {
        return Err(ConfigError::ValidationError(format!(
            "entry.method '{}' is not a valid method name",
            config.entry.method
        )));
    }
    let name = &config.backend.output_name;
    if name.is_empty() {
        return Err(ConfigError::MissingField("backend.output_name".to_string()));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ConfigError::ValidationError(format!(
            "backend.output_name '{name}' must be a plain file name"
        )));
    }
    if config.source.javac.is_empty() {
        return Err(ConfigError::MissingField("source.javac".to_string()));
    }
    if !config.stdlib.marker.starts_with('L') || !config.stdlib.marker.ends_with(';') {
        return Err(ConfigError::ValidationError(format!(
            "stdlib.marker '{}' must be a class descriptor like 'Lpkg/Marker;'",
            config.stdlib.marker
        )));
    }
    for mapping in &config.stdlib.mapping {
        if mapping.package.is_empty() {
            return Err(ConfigError::MissingField("stdlib.mapping.package".to_string()));
        }
        if mapping.target.is_empty() && mapping.class_prefix.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "stdlib mapping for '{}' changes nothing",
                mapping.package
            )));
        }
    }
    Ok(())
}

/// Returns `true` if `s` is a plausible Java identifier.
fn is_java_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
