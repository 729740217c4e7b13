//! # Prometheus Reservation Broker
//!
//! A contract-enforcing reservation broker over pluggable cluster
//! resource-manager connectors.
//!
//! Client applications submit *reservations* (bundles of resource asks
//! against a named queue) and get back *placed reservations* (resources bound
//! to cluster nodes). The broker itself never schedules anything: it wraps a
//! [`Connector`](core::Connector) that does, and guarantees uniform,
//! race-free preconditions on every call before it reaches the connector.
//!
//! ## Contract
//!
//! - **Lifecycle**: `Unstarted → Running → Stopped`. `start` is valid once,
//!   `stop` never fails and is idempotent, there is no restart.
//! - **Lifecycle first**: any call outside `Running` fails with
//!   [`BrokerError::State`](core::BrokerError::State), even with bad arguments.
//! - **Arguments second**: nil ids, nil handles and malformed reservations fail
//!   with [`BrokerError::Argument`](core::BrokerError::Argument).
//! - **Pass-through**: connector failures surface unchanged as
//!   [`BrokerError::Connector`](core::BrokerError::Connector).
//!
//! ## Example
//!
//! ```rust,ignore
//! use prometheus_reservation_broker::builders::build_in_memory_broker;
//! use prometheus_reservation_broker::config::BrokerConfig;
//! use prometheus_reservation_broker::core::{Handle, Locality, Reservation, Resource};
//!
//! let cfg = BrokerConfig::default()
//!     .with_queue("default")
//!     .with_node("node-1", 16, 65_536);
//! let broker = build_in_memory_broker(cfg)?;
//! broker.start().await?;
//!
//! let ask = Resource::new(uuid::Uuid::new_v4(), "node-1", Locality::PreferredHave, 2, 4096)?;
//! let reservation = Reservation::new(Handle::new_v4(), "default", vec![ask], false)?;
//! let placed = broker.reserve(&reservation).await?;
//!
//! broker.release_reservation(placed.id).await?;
//! broker.stop().await;
//! ```
//!
//! Thread-based callers can use `runtime::BlockingBroker` (feature
//! `tokio-runtime`, on by default).

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Reservation model, connector seam, lifecycle and contract enforcement.
pub mod core;
/// Configuration models for the broker and its connector.
pub mod config;
/// Builders to construct brokers from configuration.
pub mod builders;
/// Infrastructure adapters: connector backends and listener delivery.
pub mod infra;
/// Runtime adapters for callers outside an async context.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
