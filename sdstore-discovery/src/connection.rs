//! Swappable connection handle shared by the network backends.

use crate::error::{Result, StoreError};
use crate::settings::{self, Backend, ConfigMap, Settings};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// A handle to a store, built from settings.
pub trait StoreConnection: Send + Sync + Sized {
    fn connect(settings: &Settings) -> Result<Self>;
}

/// HTTP client honoring the read timeout and reconnect flag.
pub(crate) fn http_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(settings.read_timeout);
    if !settings.allow_reconnect {
        builder = builder.pool_max_idle_per_host(0);
    }
    builder
        .build()
        .map_err(|e| StoreError::Connection(e.to_string()))
}

/// Base URL without trailing slash.
pub(crate) fn base_url(settings: &Settings) -> Result<String> {
    Ok(settings.endpoint()?.as_str().trim_end_matches('/').to_string())
}

struct ClientState<C> {
    settings: Settings,
    template_dir: String,
    client: Arc<C>,
}

/// Settings, template root and live handle, replaced together.
pub(crate) struct ConnectedStore<C> {
    backend: Backend,
    state: RwLock<ClientState<C>>,
}

impl<C: StoreConnection> ConnectedStore<C> {
    pub(crate) fn new(backend: Backend, config: &ConfigMap) -> Result<Self> {
        let settings = Settings::extract(backend, config)?;
        let template_dir = settings::template_dir(config)?;
        let client = Arc::new(C::connect(&settings)?);

        Ok(Self {
            backend,
            state: RwLock::new(ClientState {
                settings,
                template_dir,
                client,
            }),
        })
    }

    pub(crate) fn get_client(&self, force_reset: bool) -> Result<Arc<C>> {
        if !force_reset {
            return Ok(self.state.read().client.clone());
        }

        let mut state = self.state.write();
        let client = Arc::new(C::connect(&state.settings)?);
        state.client = client.clone();
        Ok(client)
    }

    pub(crate) fn settings(&self) -> Settings {
        self.state.read().settings.clone()
    }

    pub(crate) fn template_dir(&self) -> String {
        self.state.read().template_dir.clone()
    }

    // Everything is built before the lock is taken so a bad config leaves the
    // current state untouched.
    pub(crate) fn reconfigure(&self, config: &ConfigMap) -> Result<()> {
        let settings = Settings::extract(self.backend, config)?;
        let template_dir = if config.contains_key("template_dir") {
            Some(settings::template_dir(config)?)
        } else {
            None
        };
        let client = Arc::new(C::connect(&settings)?);

        let mut state = self.state.write();
        info!(
            "Reconfigured {} client: {} -> {}",
            self.backend,
            state.settings.base_url(),
            settings.base_url()
        );
        state.settings = settings;
        state.client = client;
        if let Some(dir) = template_dir {
            state.template_dir = dir;
        }

        Ok(())
    }
}
