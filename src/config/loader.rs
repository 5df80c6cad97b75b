use super::types::*;
use crate::utils::encryption::PassSpec;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::errors::BackupError {
    fn from(err: ConfigError) -> Self {
        crate::errors::BackupError::InvalidConfiguration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load the config file when given, otherwise fall back to defaults
/// (every value can still be supplied through the environment)
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

/// Validate the configuration
fn validate_config(config: &Config) -> Result<()> {
    if let Some(timeout) = config.global.command_timeout_seconds {
        if timeout == 0 {
            return Err(ConfigError::ValidationError(
                "command_timeout_seconds must be greater than zero".to_string(),
            ));
        }
    }

    if config.global.log_max_files == 0 {
        return Err(ConfigError::ValidationError(
            "log_max_files must be greater than zero".to_string(),
        ));
    }

    config
        .global
        .encrypt_pass_spec
        .parse::<PassSpec>()
        .map_err(|e| ConfigError::ValidationError(format!("encrypt_pass_spec: {}", e)))?;

    if let Some(ref local_path) = config.global.local_path {
        if local_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "local_path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
