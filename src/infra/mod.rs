//! Infrastructure adapters: connector backends and listener delivery.

pub mod connector;
pub mod notifier;

pub use connector::{ConnectorBehavior, ConnectorStats, InMemoryConnector};
pub use notifier::{Notifier, NotifierStats};
