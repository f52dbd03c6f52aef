//! etcd template store

use crate::connection::{self, ConnectedStore, StoreConnection};
use crate::error::{Result, StoreError};
use crate::settings::{Backend, ConfigMap, Settings};
use crate::store::{self, TemplateStore};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Connection to an etcd cluster through its v3 JSON gateway
pub struct EtcdConnection {
    base_url: String,
    client: reqwest::Client,
}

impl StoreConnection for EtcdConnection {
    fn connect(settings: &Settings) -> Result<Self> {
        Ok(Self {
            base_url: connection::base_url(settings)?,
            client: connection::http_client(settings)?,
        })
    }
}

impl EtcdConnection {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read one key's value
    pub async fn get(&self, key: &str, timeout: Duration) -> Result<String> {
        let url = format!("{}/v3/kv/range", self.base_url);

        // Base64 encode key for etcd v3 API
        let payload = serde_json::json!({
            "key": general_purpose::STANDARD.encode(key.as_bytes()),
        });

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::from_transport(key, e))?;

        if !response.status().is_success() {
            return Err(StoreError::Connection(format!(
                "etcd returned {} for {}",
                response.status(),
                key
            )));
        }

        #[derive(Deserialize)]
        struct EtcdResponse {
            kvs: Option<Vec<EtcdKV>>,
        }

        // etcd omits `value` for empty values
        #[derive(Deserialize)]
        struct EtcdKV {
            value: Option<String>,
        }

        let etcd_response: EtcdResponse = response
            .json()
            .await
            .map_err(|e| StoreError::from_transport(key, e))?;

        let kv = etcd_response
            .kvs
            .and_then(|kvs| kvs.into_iter().next())
            .ok_or_else(|| store::not_found(key))?;

        let value_bytes = general_purpose::STANDARD
            .decode(kv.value.unwrap_or_default())
            .map_err(|e| StoreError::MalformedResponse(format!("{}: {}", key, e)))?;

        String::from_utf8(value_bytes)
            .map_err(|e| StoreError::MalformedResponse(format!("{}: {}", key, e)))
    }
}

/// etcd-backed template store
pub struct EtcdStore {
    inner: ConnectedStore<EtcdConnection>,
}

impl EtcdStore {
    /// Create a store from a config mapping (`host`, `port`, `protocol`,
    /// `allow_reconnect`, `timeout`, `template_dir`)
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use sdstore_discovery::{ConfigMap, EtcdStore};
    ///
    /// let etcd = EtcdStore::new(&ConfigMap::new())?;
    /// ```
    pub fn new(config: &ConfigMap) -> Result<Self> {
        Ok(Self {
            inner: ConnectedStore::new(Backend::Etcd, config)?,
        })
    }

    /// Cached connection handle, rebuilt from the current settings on reset
    pub fn get_client(&self, force_reset: bool) -> Result<Arc<EtcdConnection>> {
        self.inner.get_client(force_reset)
    }
}

#[async_trait]
impl TemplateStore for EtcdStore {
    fn backend(&self) -> &'static str {
        Backend::Etcd.as_str()
    }

    fn settings(&self) -> Settings {
        self.inner.settings()
    }

    fn template_dir(&self) -> String {
        self.inner.template_dir()
    }

    async fn read(&self, path: &str, timeout: Duration) -> Result<String> {
        let client = self.get_client(false)?;
        let value = client.get(path, timeout).await?;
        debug!("Read {} from etcd", path);
        Ok(value)
    }

    fn reconfigure(&self, config: &ConfigMap) -> Result<()> {
        self.inner.reconfigure(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etcd_store_creation() {
        let etcd = EtcdStore::new(&ConfigMap::new()).unwrap();
        assert_eq!(etcd.backend(), "etcd");
        assert_eq!(etcd.template_dir(), "/datadog/check_configs");
        assert_eq!(etcd.get_client(false).unwrap().base_url(), "http://127.0.0.1:4001");
    }

    #[test]
    fn test_etcd_store_rejects_bad_port() {
        let mut config = ConfigMap::new();
        config.insert("port".to_string(), serde_json::json!("etcd"));

        assert!(matches!(EtcdStore::new(&config), Err(StoreError::Config(_))));
    }
}
