//! Configuration models for the broker and its connector.

pub mod broker;

pub use broker::{
    BrokerConfig, ConnectorBackendConfig, NodeConfig, CONFIG_JSON_ENV, CONFIG_PATH_ENV,
};
