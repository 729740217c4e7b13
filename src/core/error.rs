//! Error types for broker and connector operations.

use thiserror::Error;

/// Operational failures reported by a connector.
///
/// These are opaque to the contract layer and are passed through unchanged
/// inside [`BrokerError::Connector`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The resource manager could not be reached.
    #[error("resource manager unavailable: {0}")]
    Unavailable(String),
    /// The reservation targets a queue the connector does not serve.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
    /// A reservation with the same identifier already exists.
    #[error("duplicate reservation: {0}")]
    DuplicateReservation(String),
    /// The resource manager refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors produced by the contract-enforcing broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Operation invoked in a lifecycle state that forbids it.
    #[error("illegal state: {0}")]
    State(String),
    /// Caller supplied a missing or malformed argument.
    #[error("illegal argument: {0}")]
    Argument(String),
    /// Failure reported by the underlying connector.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

impl BrokerError {
    /// Whether this error is a lifecycle violation.
    #[must_use]
    pub const fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Whether this error is an argument violation.
    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    /// Whether this error originated in the connector.
    #[must_use]
    pub const fn is_connector(&self) -> bool {
        matches!(self, Self::Connector(_))
    }
}

/// Result alias for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
