// Agent configuration for sdstore
//
// The agent configuration is a set of named sections holding string values,
// the shape of the monitoring agent's `datadog.conf`. Service discovery reads
// its options from the `Main` section.

pub mod builder;
pub mod env;
pub mod error;
pub mod loader;

pub use builder::AgentConfigBuilder;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Section holding the agent's top-level options.
pub const DEFAULT_SECTION: &str = "Main";

/// Sectioned agent configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl AgentConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for layering files and environment variables
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::new()
    }

    /// Build from a parsed document.
    ///
    /// Nested objects become sections; top-level scalars land in `Main`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ConfigError::ParseError(
                "configuration root must be a table".to_string(),
            ));
        };

        let mut config = Self::new();
        for (key, value) in map {
            match value {
                Value::Object(section) => {
                    for (option, value) in section {
                        config.set(&key, &option, value_to_string(value));
                    }
                }
                other => config.set(DEFAULT_SECTION, &key, value_to_string(other)),
            }
        }

        Ok(config)
    }

    /// Parse configuration from a string in the given format
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        Self::from_value(ConfigLoader::new(format).parse(content)?)
    }

    /// Load configuration from a file, detecting the format from its extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let loader = ConfigLoader::auto(path.as_ref())?;
        Self::from_value(loader.load_file(path)?)
    }

    /// Merge values from a file into this configuration
    pub fn load_file(&mut self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let loaded = Self::from_value(ConfigLoader::new(format).load_file(path)?)?;
        debug!("Loaded agent configuration from {}", path.display());
        self.merge(loaded);
        Ok(())
    }

    /// Merge prefixed environment variables into the `Main` section
    pub fn load_env(&mut self, prefix: Option<String>) -> Result<()> {
        let vars = EnvLoader::new(prefix).load()?;
        for (key, value) in vars {
            self.set(DEFAULT_SECTION, &key, value);
        }
        Ok(())
    }

    /// Set an option
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Remove an option, returning its value
    pub fn remove(&mut self, section: &str, key: &str) -> Option<String> {
        self.sections.get_mut(section)?.remove(key)
    }

    /// Get an option's raw value
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|options| options.get(key))
            .map(String::as_str)
    }

    /// Get an option, failing when it is absent
    pub fn require(&self, section: &str, key: &str) -> Result<&str> {
        self.get(section, key)
            .ok_or_else(|| ConfigError::KeyNotFound(format!("{}.{}", section, key)))
    }

    /// Get an option or a default
    pub fn get_or(&self, section: &str, key: &str, default: &str) -> String {
        self.get(section, key).unwrap_or(default).to_string()
    }

    /// Get an option coerced with `FromStr`
    pub fn get_parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>> {
        match self.get(section, key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::invalid(key, raw, std::any::type_name::<T>())),
            None => Ok(None),
        }
    }

    /// Get a boolean option (`true/false`, `yes/no`, `on/off`, `1/0`)
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get(section, key) {
            Some(raw) => parse_bool(raw)
                .map(Some)
                .ok_or_else(|| ConfigError::invalid(key, raw, "boolean")),
            None => Ok(None),
        }
    }

    /// Check whether an option is set
    pub fn has_option(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }

    /// Check whether a section exists
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Section names
    pub fn sections(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    /// Option names of a section
    pub fn keys(&self, section: &str) -> Vec<String> {
        self.sections
            .get(section)
            .map(|options| options.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Merge another configuration; its values win
    pub fn merge(&mut self, other: AgentConfig) {
        for (section, options) in other.sections {
            self.sections.entry(section).or_default().extend(options);
        }
    }
}

/// Lenient boolean coercion shared with the store settings.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
