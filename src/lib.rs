// sdstore - check-template lookup for service discovery
//
// This library lets a monitoring agent find the check configuration templates
// for the services it discovers, stored in etcd or Consul.

// Re-export the template stores
pub use sdstore_discovery::*;

// Re-export agent configuration
pub use sdstore_config as config;
pub use sdstore_config::{AgentConfig, AgentConfigBuilder, ConfigError, FileFormat};

use std::sync::Arc;

/// Select the registry's store from an agent configuration.
///
/// Reads the service discovery options from the `Main` section and hands them
/// to [`StoreRegistry::select_from`].
pub fn store_for_agent(
    registry: &StoreRegistry,
    agent: &AgentConfig,
) -> Result<Arc<dyn TemplateStore>> {
    registry.select_from(&extract_sd_config(agent))
}

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AgentConfig,
        Backend,
        ConfigMap,
        ReadOptions,
        SdConfig,
        StoreError,
        StoreRegistry,
        Template,
        TemplateStore,
        extract_sd_config,
        store_for_agent,
    };
}
