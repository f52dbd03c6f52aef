// AgentConfigBuilder - layered agent configuration

use crate::{AgentConfig, ConfigError, FileFormat, Result};
use std::path::PathBuf;

/// Builder for [`AgentConfig`].
///
/// Sources are applied in order: files, then the `.env` file, then
/// environment variables. Later sources override earlier ones.
pub struct AgentConfigBuilder {
    config: AgentConfig,
    env_prefix: Option<String>,
    load_env: bool,
    load_dotenv: bool,
    dotenv_path: Option<PathBuf>,
    config_files: Vec<(PathBuf, Option<FileFormat>)>,
}

impl AgentConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::new(),
            env_prefix: None,
            load_env: false,
            load_dotenv: false,
            dotenv_path: None,
            config_files: Vec::new(),
        }
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Set an option directly, before any source is applied
    pub fn with_option(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.config.set(section, key, value);
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Enable loading from .env file
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Add configuration file to load with an explicit format
    pub fn add_file(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.config_files.push((path.into(), Some(format)));
        self
    }

    /// Add configuration file whose format comes from its extension
    pub fn add_file_auto(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push((path.into(), None));
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AgentConfig> {
        let mut config = self.config;

        for (path, format) in self.config_files {
            match format {
                Some(format) => config.load_file(&path, format)?,
                None => config.merge(AgentConfig::from_file(&path)?),
            }
        }

        if self.load_dotenv {
            match self.dotenv_path {
                Some(path) => {
                    dotenvy::from_path(&path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
                }
                None => {
                    dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
                }
            }
        }

        // A .env file only feeds the process environment, so it implies `load_env`.
        if self.load_env || self.load_dotenv {
            config.load_env(self.env_prefix)?;
        }

        Ok(config)
    }
}

impl Default for AgentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
