//! Store connection settings.

use crate::error::StoreError;
use sdstore_config::{parse_bool, ConfigError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Generic key-mapping configuration handed to a store.
pub type ConfigMap = HashMap<String, Value>;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_ETCD_PORT: u16 = 4001;
pub const DEFAULT_CONSUL_PORT: u16 = 8500;
pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_RECONNECT: bool = true;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Root of the template key hierarchy.
pub const SD_TEMPLATE_DIR: &str = "/datadog/check_configs";

/// Supported config store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Etcd,
    Consul,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Etcd, Backend::Consul];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Etcd => "etcd",
            Backend::Consul => "consul",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Backend::Etcd => DEFAULT_ETCD_PORT,
            Backend::Consul => DEFAULT_CONSUL_PORT,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "etcd" => Ok(Backend::Etcd),
            "consul" => Ok(Backend::Consul),
            _ => Err(StoreError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Connection parameters for one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub allow_reconnect: bool,
    pub read_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::defaults(Backend::Etcd)
    }
}

impl Settings {
    /// Defaults for a backend, used for every field absent from the config.
    pub fn defaults(backend: Backend) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: backend.default_port(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            allow_reconnect: DEFAULT_RECONNECT,
            read_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Pull connection settings out of a generic config mapping.
    ///
    /// Each missing field falls back to its default independently. Values are
    /// only coerced (`"4001"` is a valid port), never validated further.
    pub fn extract(backend: Backend, config: &ConfigMap) -> Result<Self, ConfigError> {
        let mut settings = Self::defaults(backend);

        if let Some(host) = string_value(config, "host")? {
            settings.host = host;
        }
        if let Some(port) = port_value(config, "port")? {
            settings.port = port;
        }
        if let Some(protocol) = string_value(config, "protocol")? {
            settings.protocol = protocol;
        }
        if let Some(reconnect) = bool_value(config, "allow_reconnect")? {
            settings.allow_reconnect = reconnect;
        }
        if let Some(timeout) = seconds_value(config, "timeout")? {
            settings.read_timeout = timeout;
        }

        Ok(settings)
    }

    /// `{protocol}://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Parsed base URL; fails when host or protocol do not form a URL.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let base = self.base_url();
        let url = Url::parse(&base).map_err(|_| ConfigError::invalid("host", &base, "URL authority"))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::invalid("protocol", &self.protocol, "URL scheme"));
        }
        Ok(url)
    }
}

/// Template root from a config mapping, `/datadog/check_configs` when unset.
pub fn template_dir(config: &ConfigMap) -> Result<String, ConfigError> {
    Ok(string_value(config, "template_dir")?.unwrap_or_else(|| SD_TEMPLATE_DIR.to_string()))
}

fn string_value(config: &ConfigMap, key: &str) -> Result<Option<String>, ConfigError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(ConfigError::invalid(key, other, "string")),
    }
}

fn port_value(config: &ConfigMap, key: &str) -> Result<Option<u16>, ConfigError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, n, "port number")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, s, "port number")),
        Some(other) => Err(ConfigError::invalid(key, other, "port number")),
    }
}

fn bool_value(config: &ConfigMap, key: &str) -> Result<Option<bool>, ConfigError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => parse_bool(s)
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, s, "boolean")),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(ConfigError::invalid(key, n, "boolean")),
        },
        Some(other) => Err(ConfigError::invalid(key, other, "boolean")),
    }
}

fn seconds_value(config: &ConfigMap, key: &str) -> Result<Option<Duration>, ConfigError> {
    let secs = match config.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match secs.and_then(|secs| Duration::try_from_secs_f64(secs).ok()) {
        Some(timeout) => Ok(Some(timeout)),
        None => Err(ConfigError::invalid(
            key,
            config.get(key).map(Value::to_string).unwrap_or_default(),
            "seconds",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> ConfigMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let settings = Settings::extract(Backend::Etcd, &ConfigMap::new()).unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 4001);
        assert_eq!(settings.protocol, "http");
        assert!(settings.allow_reconnect);
        assert_eq!(settings.read_timeout, Duration::from_secs(5));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_consul_default_port() {
        let settings = Settings::extract(Backend::Consul, &ConfigMap::new()).unwrap();
        assert_eq!(settings.port, 8500);
        assert_eq!(settings.base_url(), "http://127.0.0.1:8500");
    }

    #[test]
    fn test_defaults_apply_per_field() {
        let settings = Settings::extract(Backend::Etcd, &map(json!({"host": "etcd.local"}))).unwrap();
        assert_eq!(settings.host, "etcd.local");
        assert_eq!(settings.port, 4001);

        let settings = Settings::extract(Backend::Etcd, &map(json!({"port": "2379"}))).unwrap();
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 2379);

        let settings =
            Settings::extract(Backend::Etcd, &map(json!({"protocol": "https"}))).unwrap();
        assert_eq!(settings.protocol, "https");
        assert!(settings.allow_reconnect);

        let settings =
            Settings::extract(Backend::Etcd, &map(json!({"allow_reconnect": "false"}))).unwrap();
        assert!(!settings.allow_reconnect);
        assert_eq!(settings.protocol, "http");
    }

    #[test]
    fn test_coercions() {
        let settings = Settings::extract(
            Backend::Consul,
            &map(json!({"port": 8501, "allow_reconnect": false, "timeout": "0.5"})),
        )
        .unwrap();
        assert_eq!(settings.port, 8501);
        assert!(!settings.allow_reconnect);
        assert_eq!(settings.read_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_uncoercible_values_fail() {
        for bad in [
            json!({"port": "forty"}),
            json!({"port": 70000}),
            json!({"port": [1]}),
            json!({"allow_reconnect": "sometimes"}),
            json!({"timeout": -1}),
            json!({"timeout": 1e20}),
            json!({"timeout": "inf"}),
            json!({"host": {"name": "x"}}),
        ] {
            let result = Settings::extract(Backend::Etcd, &map(bad.clone()));
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { .. })),
                "expected failure for {}",
                bad
            );
        }
    }

    #[test]
    fn test_endpoint() {
        let settings = Settings::default();
        assert_eq!(settings.endpoint().unwrap().as_str(), "http://127.0.0.1:4001/");

        let bad = Settings {
            host: "bad host".to_string(),
            ..Settings::default()
        };
        assert!(bad.endpoint().is_err());
    }

    #[test]
    fn test_template_dir() {
        assert_eq!(template_dir(&ConfigMap::new()).unwrap(), "/datadog/check_configs");
        assert_eq!(
            template_dir(&map(json!({"template_dir": "/sd"}))).unwrap(),
            "/sd"
        );
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("etcd".parse::<Backend>().unwrap(), Backend::Etcd);
        assert_eq!(" Consul ".parse::<Backend>().unwrap(), Backend::Consul);
        assert!(matches!(
            "zookeeper".parse::<Backend>(),
            Err(StoreError::UnsupportedBackend(kind)) if kind == "zookeeper"
        ));
        assert_eq!(Backend::Consul.to_string(), "consul");
    }
}
