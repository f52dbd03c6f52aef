//! Consul template store

use crate::connection::{self, ConnectedStore, StoreConnection};
use crate::error::{Result, StoreError};
use crate::settings::{Backend, ConfigMap, Settings};
use crate::store::{self, TemplateStore};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Connection to a Consul agent's KV HTTP API
pub struct ConsulConnection {
    endpoint: Url,
    base_url: String,
    client: reqwest::Client,
}

impl StoreConnection for ConsulConnection {
    fn connect(settings: &Settings) -> Result<Self> {
        Ok(Self {
            endpoint: settings.endpoint()?,
            base_url: connection::base_url(settings)?,
            client: connection::http_client(settings)?,
        })
    }
}

impl ConsulConnection {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/v1/kv/{key}` with each key segment percent-encoded
    pub fn key_url(&self, key: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Connection(format!("{} cannot hold a KV path", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "kv"])
            // Consul keys carry no leading slash
            .extend(key.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// Read one key's value
    pub async fn get(&self, key: &str, timeout: Duration) -> Result<String> {
        let url = self.key_url(key)?;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| StoreError::from_transport(key, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(store::not_found(key));
        }

        if !response.status().is_success() {
            return Err(StoreError::Connection(format!(
                "consul returned {} for {}",
                response.status(),
                key
            )));
        }

        #[derive(Deserialize)]
        struct ConsulKV {
            #[serde(rename = "Value")]
            value: Option<String>,
        }

        let entries: Vec<ConsulKV> = response
            .json()
            .await
            .map_err(|e| StoreError::from_transport(key, e))?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| store::not_found(key))?;

        let value_bytes = general_purpose::STANDARD
            .decode(entry.value.unwrap_or_default())
            .map_err(|e| StoreError::MalformedResponse(format!("{}: {}", key, e)))?;

        String::from_utf8(value_bytes)
            .map_err(|e| StoreError::MalformedResponse(format!("{}: {}", key, e)))
    }
}

/// Consul-backed template store
pub struct ConsulStore {
    inner: ConnectedStore<ConsulConnection>,
}

impl ConsulStore {
    /// Create a store from a config mapping
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use sdstore_discovery::{ConfigMap, ConsulStore};
    ///
    /// let consul = ConsulStore::new(&ConfigMap::new())?;
    /// ```
    pub fn new(config: &ConfigMap) -> Result<Self> {
        Ok(Self {
            inner: ConnectedStore::new(Backend::Consul, config)?,
        })
    }

    /// Cached connection handle, rebuilt from the current settings on reset
    pub fn get_client(&self, force_reset: bool) -> Result<Arc<ConsulConnection>> {
        self.inner.get_client(force_reset)
    }
}

#[async_trait]
impl TemplateStore for ConsulStore {
    fn backend(&self) -> &'static str {
        Backend::Consul.as_str()
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
        debug!("Read {} from consul", path);
        Ok(value)
    }

    fn reconfigure(&self, config: &ConfigMap) -> Result<()> {
        self.inner.reconfigure(config)
    }
}
