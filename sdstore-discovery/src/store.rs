//! Check templates and the store capability shared by every backend.

use crate::error::{Result, StoreError};
use crate::fallback;
use crate::settings::{ConfigMap, Settings};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sub-keys read under `{template_dir}/{key}/`, in order.
pub const TEMPLATE_FIELDS: [&str; 3] = ["check_name", "init_config", "instance"];

/// How to run a monitoring check for one discovered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Check to run
    pub check_name: String,

    /// Raw `init_config` template, if one was read
    pub init_config: Option<String>,

    /// Raw instance template, if one was read
    pub instance: Option<String>,
}

impl Template {
    /// Create a fully populated template
    pub fn new(
        check_name: impl Into<String>,
        init_config: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            init_config: Some(init_config.into()),
            instance: Some(instance.into()),
        }
    }

    /// Whether both config templates were read from the store
    pub fn is_complete(&self) -> bool {
        self.init_config.is_some() && self.instance.is_some()
    }

    /// Split into `(check_name, init_config, instance)`
    pub fn into_parts(self) -> (String, Option<String>, Option<String>) {
        (self.check_name, self.init_config, self.instance)
    }
}

/// Per-lookup read options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Overrides the store's configured read timeout
    pub timeout: Option<Duration>,
}

impl ReadOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// `{template_dir}/{key}/{field}`
pub fn template_path(template_dir: &str, key: &str, field: &str) -> String {
    format!("{}/{}/{}", template_dir.trim_end_matches('/'), key, field)
}

/// A key-value store holding check templates
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Backend name, for logs
    fn backend(&self) -> &'static str;

    /// Current connection settings
    fn settings(&self) -> Settings;

    /// Current template root
    fn template_dir(&self) -> String;

    /// Read a single key
    async fn read(&self, path: &str, timeout: Duration) -> Result<String>;

    /// Replace settings and connection handle in one step
    fn reconfigure(&self, config: &ConfigMap) -> Result<()>;

    /// Fetch the check template for a discovery key.
    ///
    /// Missing keys and timeouts fall back to the built-in image table. Every
    /// other failure is logged and yields `None`, as does a key with neither a
    /// stored template nor a table entry.
    async fn get_check_template(&self, key: &str, options: &ReadOptions) -> Option<Template> {
        let template_dir = self.template_dir();
        let timeout = options.timeout.unwrap_or_else(|| self.settings().read_timeout);
        let mut values: [Option<String>; 3] = Default::default();

        for (idx, field) in TEMPLATE_FIELDS.iter().enumerate() {
            let path = template_path(&template_dir, key, field);
            match self.read(&path, timeout).await {
                Ok(value) => values[idx] = Some(value),
                Err(e) if e.is_fallback_eligible() => {
                    info!(
                        "Could not find directory {} in {} configs ({}), trying to auto-configure the check...",
                        key,
                        self.backend(),
                        e
                    );
                    let [_, init_config, instance] = values;
                    return fallback_template(key, init_config, instance);
                }
                Err(e) => {
                    warn!(
                        "Fetching the value for {} in {} failed ({}), this check will not be configured by the service discovery.",
                        key,
                        self.backend(),
                        e
                    );
                    return None;
                }
            }
        }

        let [check_name, init_config, instance] = values;
        debug!("Found template for {} in {}", key, self.backend());
        Some(Template {
            check_name: check_name?,
            init_config,
            instance,
        })
    }
}

fn fallback_template(
    key: &str,
    init_config: Option<String>,
    instance: Option<String>,
) -> Option<Template> {
    match fallback::check_for_image(key) {
        Some(check_name) => {
            debug!("Auto-configuring {} with check {}", key, check_name);
            Some(Template {
                check_name: check_name.to_string(),
                init_config,
                instance,
            })
        }
        None => {
            info!("No template or default check for {}, it will not be configured", key);
            None
        }
    }
}

/// Shorthand used by backends when a key holds no value.
pub(crate) fn not_found(path: &str) -> StoreError {
    StoreError::KeyNotFound(path.to_string())
}
