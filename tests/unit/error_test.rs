//! Tests for error types

use prometheus_reservation_broker::core::{BrokerError, ConnectorError};

#[test]
fn test_state_error() {
    let err = BrokerError::State("not running".to_string());
    assert_eq!(format!("{}", err), "illegal state: not running");
    assert!(err.is_state());
    assert!(!err.is_argument());
}

#[test]
fn test_argument_error() {
    let err = BrokerError::Argument("reservation id cannot be nil".to_string());
    assert_eq!(format!("{}", err), "illegal argument: reservation id cannot be nil");
    assert!(err.is_argument());
}

#[test]
fn test_connector_error_is_transparent() {
    let err: BrokerError = ConnectorError::Unavailable("rm down".to_string()).into();
    assert_eq!(format!("{}", err), "resource manager unavailable: rm down");
    assert!(err.is_connector());
    assert_eq!(
        err,
        BrokerError::Connector(ConnectorError::Unavailable("rm down".to_string()))
    );
}

#[test]
fn test_connector_error_messages() {
    assert_eq!(
        format!("{}", ConnectorError::UnknownQueue("gpu".into())),
        "unknown queue: gpu"
    );
    assert_eq!(
        format!("{}", ConnectorError::Backend("io".into())),
        "backend error: io"
    );
}
