//! Connector backends.

pub mod memory;

pub use memory::{ConnectorBehavior, ConnectorStats, InMemoryConnector};
