//! Builders to construct brokers from configuration.

use crate::config::{BrokerConfig, ConnectorBackendConfig};
use crate::core::{BrokerError, Connector, ContractBroker};
use crate::infra::InMemoryConnector;

/// Validate `cfg` and wrap the connector produced by `connector_factory`.
///
/// # Errors
///
/// Returns [`BrokerError::Argument`] for an invalid configuration, or any
/// error the factory reports.
pub fn build_broker<C, F>(
    cfg: BrokerConfig,
    connector_factory: F,
) -> Result<ContractBroker<C>, BrokerError>
where
    C: Connector,
    F: FnOnce(BrokerConfig) -> Result<C, BrokerError>,
{
    cfg.validate()
        .map_err(|e| BrokerError::Argument(format!("config invalid: {e}")))?;
    let name = cfg.name.clone();
    let connector = connector_factory(cfg)?;
    tracing::debug!(broker = %name, "broker built");
    Ok(ContractBroker::new(connector))
}

/// Build a broker over the connector backend selected in `cfg`.
///
/// # Errors
///
/// Returns [`BrokerError::Argument`] for an invalid configuration.
pub fn build_in_memory_broker(
    cfg: BrokerConfig,
) -> Result<ContractBroker<InMemoryConnector>, BrokerError> {
    build_broker(cfg, |cfg| match cfg.connector {
        ConnectorBackendConfig::InMemory => Ok(InMemoryConnector::new(cfg)),
    })
}
