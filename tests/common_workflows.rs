//! Integration tests for common sdstore workflows.
//!
//! These tests go from an agent configuration file to a resolved check template.

use base64::{Engine as _, engine::general_purpose};
use sdstore::prelude::*;
use sdstore::{FileFormat, InMemoryStore, SimulatedFailure};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Agent configuration
// =============================================================================

#[test]
fn test_agent_without_sd_options_uses_defaults() {
    let agent = AgentConfig::parse("[Main]\ndd_url: https://app.example.com\n", FileFormat::Ini)
        .unwrap();
    let sd_config = extract_sd_config(&agent);

    assert_eq!(sd_config.backend, "etcd");
    assert_eq!(sd_config.template_dir, "/datadog/check_configs");
    assert!(sd_config.host.is_none());
    assert!(sd_config.port.is_none());
}

#[test]
fn test_agent_file_selects_consul() {
    let mut file = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
    writeln!(
        file,
        "[Main]\nsd_config_backend: consul\nsd_backend_host: 10.0.0.3\nsd_backend_port: 8501"
    )
    .unwrap();

    let agent = AgentConfig::from_file(file.path()).unwrap();
    let registry = StoreRegistry::new();
    let store = sdstore::store_for_agent(&registry, &agent).unwrap();

    assert_eq!(store.backend(), "consul");
    assert_eq!(store.settings().host, "10.0.0.3");
    assert_eq!(store.settings().port, 8501);
}

#[test]
fn test_agent_with_bad_port_fails_selection() {
    let agent =
        AgentConfig::parse("[Main]\nsd_backend_port = four\n", FileFormat::Ini).unwrap();
    let registry = StoreRegistry::new();

    let result = sdstore::store_for_agent(&registry, &agent);
    assert!(matches!(result, Err(StoreError::Config(_))));
    assert!(!registry.is_configured());
}

#[test]
fn test_agent_with_unknown_backend_fails_selection() {
    let agent =
        AgentConfig::parse("[Main]\nsd_config_backend = zookeeper\n", FileFormat::Ini).unwrap();
    let registry = StoreRegistry::new();

    let result = sdstore::store_for_agent(&registry, &agent);
    assert!(matches!(result, Err(StoreError::UnsupportedBackend(kind)) if kind == "zookeeper"));
    assert!(!registry.is_configured());
}

// =============================================================================
// End-to-end lookups
// =============================================================================

#[tokio::test]
async fn test_etcd_lookup_from_agent_config() {
    let server = MockServer::start().await;
    for (field, value) in [("check_name", "redisdb"), ("init_config", "{}"), ("instance", "{}")] {
        let key = format!("/datadog/check_configs/redis/{}", field);
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .and(body_json(json!({ "key": general_purpose::STANDARD.encode(&key) })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kvs": [{ "key": general_purpose::STANDARD.encode(&key), "value": general_purpose::STANDARD.encode(value) }]
            })))
            .mount(&server)
            .await;
    }

    let addr = server.address();
    let agent = AgentConfig::builder()
        .with_option("Main", "sd_config_backend", "etcd")
        .with_option("Main", "sd_backend_host", addr.ip().to_string())
        .with_option("Main", "sd_backend_port", addr.port().to_string())
        .build()
        .unwrap();

    let registry = StoreRegistry::new();
    let store = sdstore::store_for_agent(&registry, &agent).unwrap();
    let template = store
        .get_check_template("redis", &ReadOptions::default())
        .await
        .unwrap();

    assert_eq!(
        template.into_parts(),
        ("redisdb".to_string(), Some("{}".to_string()), Some("{}".to_string()))
    );
}

#[tokio::test]
async fn test_discovery_components_share_the_store() {
    let store = InMemoryStore::new();
    store.put_template("redis", "redisdb", "{}", r#"{"host": "%%host%%"}"#).await;
    store
        .fail_with("/datadog/check_configs/mongo/check_name", SimulatedFailure::Timeout)
        .await;
    store
        .fail_with("/datadog/check_configs/nginx/check_name", SimulatedFailure::Connection)
        .await;

    let registry = StoreRegistry::new();
    registry.install(Arc::new(store));

    // Another component holding a clone of the registry sees the same store
    let discovery = registry.clone();
    let active = discovery.select("etcd", &ConfigMap::new()).unwrap();
    assert_eq!(active.backend(), "memory");

    let redis = active.get_check_template("redis", &ReadOptions::default()).await.unwrap();
    assert_eq!(redis.instance.as_deref(), Some(r#"{"host": "%%host%%"}"#));

    // Timeout on a known image falls back
    let mongo = active.get_check_template("mongo", &ReadOptions::default()).await.unwrap();
    assert_eq!(mongo.check_name, "mongo");

    // Connection failures never fall back
    assert!(active.get_check_template("nginx", &ReadOptions::default()).await.is_none());

    // Neither stored nor known
    assert!(active
        .get_check_template("unknown-image", &ReadOptions::default())
        .await
        .is_none());
}

#[test]
fn test_registry_reconfigure_swaps_backend() {
    let registry = StoreRegistry::new();
    let etcd = registry.select("etcd", &ConfigMap::new()).unwrap();
    assert_eq!(etcd.settings().port, 4001);

    let consul = registry
        .reconfigure("consul", &SdConfig::default().store_config())
        .unwrap();
    assert_eq!(consul.settings().port, 8500);
    assert_eq!(registry.current().unwrap().backend(), "consul");
    assert_eq!(Backend::Consul.default_port(), consul.settings().port);
}
