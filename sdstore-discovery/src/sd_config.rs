//! Service discovery options from the agent configuration.

use crate::error::Result;
use crate::settings::{Backend, ConfigMap, SD_TEMPLATE_DIR};
use sdstore_config::{AgentConfig, DEFAULT_SECTION};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SD_BACKEND: &str = "etcd";

/// Agent-level service discovery options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdConfig {
    /// `sd_config_backend`
    pub backend: String,

    /// `backend_template_dir`
    pub template_dir: String,

    /// `sd_backend_host`, only when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// `sd_backend_port`, only when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl Default for SdConfig {
    fn default() -> Self {
        Self {
            backend: DEFAULT_SD_BACKEND.to_string(),
            template_dir: SD_TEMPLATE_DIR.to_string(),
            host: None,
            port: None,
        }
    }
}

impl SdConfig {
    /// Parsed backend kind
    pub fn backend_kind(&self) -> Result<Backend> {
        self.backend.parse()
    }

    /// Mapping understood by the store settings extractor
    pub fn store_config(&self) -> ConfigMap {
        let mut config = ConfigMap::new();
        config.insert(
            "template_dir".to_string(),
            Value::String(self.template_dir.clone()),
        );
        if let Some(host) = &self.host {
            config.insert("host".to_string(), Value::String(host.clone()));
        }
        if let Some(port) = &self.port {
            config.insert("port".to_string(), Value::String(port.clone()));
        }
        config
    }
}

/// Extract the service discovery options from the `Main` section
pub fn extract_sd_config(config: &AgentConfig) -> SdConfig {
    let main = |key: &str| config.get(DEFAULT_SECTION, key).map(str::to_string);

    SdConfig {
        backend: main("sd_config_backend").unwrap_or_else(|| DEFAULT_SD_BACKEND.to_string()),
        template_dir: main("backend_template_dir").unwrap_or_else(|| SD_TEMPLATE_DIR.to_string()),
        host: main("sd_backend_host"),
        port: main("sd_backend_port"),
    }
}
