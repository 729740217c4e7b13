//! Tests for configuration validation

use prometheus_reservation_broker::config::{
    BrokerConfig, ConnectorBackendConfig, NodeConfig, CONFIG_JSON_ENV, CONFIG_PATH_ENV,
};

fn valid() -> BrokerConfig {
    BrokerConfig::default()
        .with_name("test-broker")
        .with_queue("default")
        .with_node("node-1", 8, 16_384)
        .with_node("node-2", 4, 8_192)
}

#[test]
fn test_broker_config_validation() {
    assert!(valid().validate().is_ok());
    assert!(BrokerConfig::default().validate().is_ok());
}

#[test]
fn test_broker_config_empty_name() {
    assert!(valid().with_name(" ").validate().is_err());
}

#[test]
fn test_broker_config_zero_notifier_depth() {
    assert!(valid().with_notifier_queue_depth(0).validate().is_err());
}

#[test]
fn test_broker_config_duplicate_node() {
    let cfg = valid().with_node("node-1", 1, 1);
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("node-1"));
}

#[test]
fn test_broker_config_node_without_capacity() {
    let mut cfg = valid();
    cfg.nodes.push(NodeConfig::new("empty", 0, 0));
    assert!(cfg.validate().is_err());
}

#[test]
fn test_broker_config_empty_queue_name() {
    assert!(valid().with_queue("").validate().is_err());
}

#[test]
fn test_accepts_queue() {
    assert!(valid().accepts_queue("default"));
    assert!(!valid().accepts_queue("other"));
    assert!(BrokerConfig::default().accepts_queue("anything"));
}

#[test]
fn test_broker_config_from_json() {
    let json = r#"{
        "name": "llama",
        "connector": "in_memory",
        "queues": ["default", "etl"],
        "nodes": [
            { "name": "node-1", "cpu_vcores": 8, "memory_mb": 16384 }
        ]
    }"#;

    let config = BrokerConfig::from_json_str(json).unwrap();
    assert_eq!(config.name, "llama");
    assert_eq!(config.connector, ConnectorBackendConfig::InMemory);
    assert_eq!(config.queues.len(), 2);
    assert_eq!(config.nodes[0].cpu_vcores, 8);
    assert_eq!(config.notifier_queue_depth, 1024);
}

#[test]
fn test_broker_config_from_json_invalid() {
    assert!(BrokerConfig::from_json_str("{").unwrap_err().starts_with("parse error"));
    let json = r#"{ "name": "", "connector": "in_memory" }"#;
    assert!(BrokerConfig::from_json_str(json).is_err());
}

#[test]
fn test_broker_config_from_file() {
    let path = std::env::temp_dir().join(format!("broker-config-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, serde_json::to_string(&valid()).unwrap()).unwrap();
    let loaded = BrokerConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, valid());
}

#[test]
fn test_broker_config_from_missing_file() {
    let err = BrokerConfig::from_file("/nonexistent/broker.json").unwrap_err();
    assert!(format!("{err:#}").contains("reading broker config"));
}

#[test]
fn test_broker_config_from_env() {
    // The only test in this binary touching these variables.
    std::env::remove_var(CONFIG_PATH_ENV);
    std::env::remove_var(CONFIG_JSON_ENV);
    let err = BrokerConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("neither"));

    std::env::set_var(CONFIG_JSON_ENV, r#"{ "name": "inline", "connector": "in_memory" }"#);
    let inline = BrokerConfig::from_env().unwrap();
    assert_eq!(inline.name, "inline");

    std::env::set_var(CONFIG_JSON_ENV, r#"{ "name": "", "connector": "in_memory" }"#);
    assert!(BrokerConfig::from_env().is_err());

    let path = std::env::temp_dir().join(format!("broker-env-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, serde_json::to_string(&valid()).unwrap()).unwrap();
    std::env::set_var(CONFIG_PATH_ENV, &path);
    let from_file = BrokerConfig::from_env().unwrap();
    assert_eq!(from_file, valid());

    std::env::remove_var(CONFIG_PATH_ENV);
    std::env::remove_var(CONFIG_JSON_ENV);
    std::fs::remove_file(&path).unwrap();
}
