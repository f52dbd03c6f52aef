//! In-memory template store (for testing)

use crate::error::{Result, StoreError};
use crate::settings::{self, Backend, ConfigMap, Settings, SD_TEMPLATE_DIR};
use crate::store::{self, TemplateStore, template_path};
use async_trait::async_trait;
use parking_lot::RwLock as SyncRwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Failure a read of a given path should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedFailure {
    Timeout,
    Connection,
    Malformed,
}

impl SimulatedFailure {
    fn into_error(self, path: &str) -> StoreError {
        match self {
            Self::Timeout => StoreError::Timeout(path.to_string()),
            Self::Connection => StoreError::Connection(format!("{}: connection refused", path)),
            Self::Malformed => StoreError::MalformedResponse(format!("{}: invalid body", path)),
        }
    }
}

/// In-memory template store (for testing/development)
#[derive(Clone)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    failures: Arc<RwLock<HashMap<String, SimulatedFailure>>>,
    state: Arc<SyncRwLock<(Settings, String)>>,
}

impl InMemoryStore {
    /// Create an empty store rooted at `/datadog/check_configs`
    pub fn new() -> Self {
        Self::with_template_dir(SD_TEMPLATE_DIR)
    }

    /// Create an empty store with a custom template root
    pub fn with_template_dir(template_dir: impl Into<String>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            state: Arc::new(SyncRwLock::new((Settings::default(), template_dir.into()))),
        }
    }

    /// Store a raw value
    pub async fn put(&self, path: impl Into<String>, value: impl Into<String>) {
        self.entries.write().await.insert(path.into(), value.into());
    }

    /// Store all three sub-keys of a template under the current root
    pub async fn put_template(&self, key: &str, check_name: &str, init_config: &str, instance: &str) {
        let dir = self.template_dir();
        let mut entries = self.entries.write().await;
        for (field, value) in store::TEMPLATE_FIELDS
            .into_iter()
            .zip([check_name, init_config, instance])
        {
            entries.insert(template_path(&dir, key, field), value.to_string());
        }
    }

    /// Make every read of `path` fail
    pub async fn fail_with(&self, path: impl Into<String>, failure: SimulatedFailure) {
        self.failures.write().await.insert(path.into(), failure);
    }

    /// Clear all values and simulated failures
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.failures.write().await.clear();
    }

    /// Get count of stored values
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn settings(&self) -> Settings {
        self.state.read().0.clone()
    }

    fn template_dir(&self) -> String {
        self.state.read().1.clone()
    }

    async fn read(&self, path: &str, _timeout: Duration) -> Result<String> {
        if let Some(failure) = self.failures.read().await.get(path) {
            return Err(failure.into_error(path));
        }

        self.entries
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| store::not_found(path))
    }

    fn reconfigure(&self, config: &ConfigMap) -> Result<()> {
        let new_settings = Settings::extract(Backend::Etcd, config)?;
        let template_dir = if config.contains_key("template_dir") {
            Some(settings::template_dir(config)?)
        } else {
            None
        };

        let mut state = self.state.write();
        state.0 = new_settings;
        if let Some(dir) = template_dir {
            state.1 = dir;
        }
        Ok(())
    }
}
