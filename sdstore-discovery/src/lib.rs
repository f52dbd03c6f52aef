//! Check-template stores for service discovery
//!
//! This crate looks up the check configuration templates a monitoring agent
//! uses to auto-configure checks for the services it discovers.
//!
//! ## Features
//!
//! - **Template lookup** - Read `check_name`, `init_config` and `instance`
//!   under `{template_dir}/{key}/`
//! - **Fallback** - Known images (redis, nginx, mongo) get a default check
//!   when no template is stored
//! - **Multiple Backends** - etcd, Consul, or in-memory
//! - **Registry** - One active store shared by every caller
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sdstore_config::AgentConfig;
//! use sdstore_discovery::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = AgentConfig::from_file("/etc/dd-agent/datadog.conf")?;
//!     let sd_config = extract_sd_config(&agent);
//!
//!     let registry = StoreRegistry::new();
//!     let store = registry.select_from(&sd_config)?;
//!
//!     if let Some(template) = store.get_check_template("redis", &ReadOptions::default()).await {
//!         println!("Running {}", template.check_name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### In-Memory Store (Testing)
//!
//! ```rust,ignore
//! use sdstore_discovery::*;
//!
//! let store = InMemoryStore::new();
//! store.put_template("redis", "redisdb", "{}", "{}").await;
//!
//! let registry = StoreRegistry::new();
//! registry.install(Arc::new(store));
//! ```

pub mod connection;
pub mod consul;
pub mod error;
pub mod etcd;
pub mod fallback;
pub mod memory;
pub mod registry;
pub mod sd_config;
pub mod settings;
pub mod store;

pub use connection::StoreConnection;
pub use consul::{ConsulConnection, ConsulStore};
pub use error::{Result, StoreError};
pub use etcd::{EtcdConnection, EtcdStore};
pub use fallback::{IMAGE_AND_CHECK, check_for_image};
pub use memory::{InMemoryStore, SimulatedFailure};
pub use registry::{StoreRegistry, create_store};
pub use sd_config::{SdConfig, extract_sd_config};
pub use settings::{Backend, ConfigMap, SD_TEMPLATE_DIR, Settings};
pub use store::{ReadOptions, Template, TemplateStore, template_path};
