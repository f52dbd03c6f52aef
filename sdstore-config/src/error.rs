// Error types for agent configuration

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {key}: {value:?} (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Environment variable error: {0}")]
    EnvError(#[from] std::env::VarError),
}

impl ConfigError {
    /// Build an `InvalidValue` error for a value that failed coercion.
    pub fn invalid(key: impl Into<String>, value: impl ToString, expected: &'static str) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
