//! Broker and connector configuration structures.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "BROKER_CONFIG";
/// Environment variable holding inline JSON configuration.
pub const CONFIG_JSON_ENV: &str = "BROKER_CONFIG_JSON";

/// Connector backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorBackendConfig {
    /// In-process connector for development/testing.
    InMemory,
}

/// Capacity of one cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name.
    pub name: String,
    /// Virtual cores available for reservations.
    pub cpu_vcores: u32,
    /// Memory available for reservations, in megabytes.
    pub memory_mb: u64,
}

impl NodeConfig {
    /// Create a node entry.
    pub fn new(name: impl Into<String>, cpu_vcores: u32, memory_mb: u64) -> Self {
        Self {
            name: name.into(),
            cpu_vcores,
            memory_mb,
        }
    }
}

const fn default_notifier_queue_depth() -> usize {
    1024
}

/// Root broker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker name used in logs.
    pub name: String,
    /// Connector backend selection.
    pub connector: ConnectorBackendConfig,
    /// Queues accepted by the connector. Empty accepts any queue.
    #[serde(default)]
    pub queues: Vec<String>,
    /// Cluster nodes and their capacities.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Maximum undelivered listener events before new ones are dropped.
    #[serde(default = "default_notifier_queue_depth")]
    pub notifier_queue_depth: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            name: "broker".into(),
            connector: ConnectorBackendConfig::InMemory,
            queues: Vec::new(),
            nodes: Vec::new(),
            notifier_queue_depth: default_notifier_queue_depth(),
        }
    }
}

impl BrokerConfig {
    /// Set the broker name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add an accepted queue.
    #[must_use]
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queues.push(queue.into());
        self
    }

    /// Add a cluster node.
    #[must_use]
    pub fn with_node(mut self, name: impl Into<String>, cpu_vcores: u32, memory_mb: u64) -> Self {
        self.nodes.push(NodeConfig::new(name, cpu_vcores, memory_mb));
        self
    }

    /// Set the notifier queue depth.
    #[must_use]
    pub const fn with_notifier_queue_depth(mut self, depth: usize) -> Self {
        self.notifier_queue_depth = depth;
        self
    }

    /// Whether `queue` is served by this configuration.
    #[must_use]
    pub fn accepts_queue(&self, queue: &str) -> bool {
        self.queues.is_empty() || self.queues.iter().any(|q| q == queue)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.notifier_queue_depth == 0 {
            return Err("notifier_queue_depth must be greater than 0".into());
        }
        if self.queues.iter().any(|q| q.trim().is_empty()) {
            return Err("queue names must not be empty".into());
        }
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.name.trim().is_empty() {
                return Err("node names must not be empty".into());
            }
            if !seen.insert(node.name.as_str()) {
                return Err(format!("node `{}` defined twice", node.name));
            }
            if node.cpu_vcores == 0 && node.memory_mb == 0 {
                return Err(format!("node `{}` has no capacity", node.name));
            }
        }
        Ok(())
    }

    /// Parse broker configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading broker config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid broker config {}", path.display()))
    }

    /// Load configuration from the environment, reading `.env` first.
    ///
    /// `BROKER_CONFIG` names a JSON file; otherwise `BROKER_CONFIG_JSON`
    /// holds the JSON inline.
    ///
    /// # Errors
    ///
    /// Fails if neither variable is set or the configuration is invalid.
    pub fn from_env() -> AppResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(path);
        }
        let raw = std::env::var(CONFIG_JSON_ENV)
            .with_context(|| format!("neither {CONFIG_PATH_ENV} nor {CONFIG_JSON_ENV} is set"))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid {CONFIG_JSON_ENV}"))
    }
}
