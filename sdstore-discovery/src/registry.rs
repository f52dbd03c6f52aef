//! Process-wide store selection.

use crate::consul::ConsulStore;
use crate::error::Result;
use crate::etcd::EtcdStore;
use crate::sd_config::SdConfig;
use crate::settings::{Backend, ConfigMap};
use crate::store::TemplateStore;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Build a store for a backend
pub fn create_store(backend: Backend, config: &ConfigMap) -> Result<Arc<dyn TemplateStore>> {
    let store: Arc<dyn TemplateStore> = match backend {
        Backend::Etcd => Arc::new(EtcdStore::new(config)?),
        Backend::Consul => Arc::new(ConsulStore::new(config)?),
    };
    Ok(store)
}

/// Holds the one active template store.
///
/// Build a single registry at startup and hand clones of it to every
/// component that needs the store; clones share the same slot. The first
/// successful [`select`](Self::select) wins and later calls return that
/// instance whatever their arguments, until [`reconfigure`](Self::reconfigure)
/// replaces it.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    slot: Arc<RwLock<Option<Arc<dyn TemplateStore>>>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the active store, creating it on first use.
    ///
    /// An unsupported `kind` is rejected before the registry is touched.
    pub fn select(&self, kind: &str, config: &ConfigMap) -> Result<Arc<dyn TemplateStore>> {
        let backend: Backend = kind.parse()?;

        if let Some(store) = self.slot.read().as_ref() {
            return Ok(store.clone());
        }

        let mut slot = self.slot.write();
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }

        let store = create_store(backend, config)?;
        info!("Using {} as the service discovery config store", backend);
        *slot = Some(store.clone());
        Ok(store)
    }

    /// [`select`](Self::select) driven by the agent's service discovery options
    pub fn select_from(&self, sd_config: &SdConfig) -> Result<Arc<dyn TemplateStore>> {
        self.select(&sd_config.backend, &sd_config.store_config())
    }

    /// Replace the active store with a fresh one
    pub fn reconfigure(&self, kind: &str, config: &ConfigMap) -> Result<Arc<dyn TemplateStore>> {
        let backend: Backend = kind.parse()?;
        let store = create_store(backend, config)?;

        let previous = self.slot.write().replace(store.clone());
        match previous {
            Some(old) => info!("Replaced {} config store with {}", old.backend(), backend),
            None => info!("Using {} as the service discovery config store", backend),
        }
        Ok(store)
    }

    /// Install a pre-built store if none is active; returns the active store
    pub fn install(&self, store: Arc<dyn TemplateStore>) -> Arc<dyn TemplateStore> {
        let mut slot = self.slot.write();
        slot.get_or_insert(store).clone()
    }

    /// The active store, if any
    pub fn current(&self) -> Option<Arc<dyn TemplateStore>> {
        self.slot.read().clone()
    }

    pub fn is_configured(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Drop the active store, returning it
    pub fn clear(&self) -> Option<Arc<dyn TemplateStore>> {
        self.slot.write().take()
    }
}
