//! Tests for broker builders

use prometheus_reservation_broker::builders::{build_broker, build_in_memory_broker};
use prometheus_reservation_broker::config::BrokerConfig;
use prometheus_reservation_broker::core::BrokerError;
use prometheus_reservation_broker::infra::InMemoryConnector;

#[test]
fn test_build_in_memory_broker() {
    let cfg = BrokerConfig::default().with_name("built").with_node("n1", 2, 1024);
    let broker = build_in_memory_broker(cfg).unwrap();
    assert!(!broker.is_running());
    assert_eq!(broker.config().name, "built");
    assert_eq!(broker.config().nodes.len(), 1);
}

#[test]
fn test_build_broker_rejects_invalid_config() {
    let cfg = BrokerConfig::default().with_name("");
    let err = build_in_memory_broker(cfg).err().unwrap();
    assert!(err.is_argument());
}

#[test]
fn test_build_broker_propagates_factory_error() {
    let result = build_broker(BrokerConfig::default(), |_| -> Result<InMemoryConnector, _> {
        Err(BrokerError::Argument("no connector".into()))
    });
    assert_eq!(
        result.err(),
        Some(BrokerError::Argument("no connector".into()))
    );
}
