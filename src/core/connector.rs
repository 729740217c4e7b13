//! The pluggable resource-manager connector.

use async_trait::async_trait;

use crate::config::BrokerConfig;
use crate::core::{
    ConnectorError, Handle, NodeId, PlacedReservation, Reservation, ReservationId, SharedListener,
};

/// Negotiates reservations with a cluster resource manager.
///
/// A connector implements the same operation set the broker exposes. It is
/// only ever called through [`ContractBroker`](crate::core::ContractBroker),
/// which guarantees that every call other than `start`, `stop`,
/// `is_running` and `config` happens while running and with well-formed
/// arguments. Connectors report operational failures as
/// [`ConnectorError`] and never produce contract errors.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_reservation_broker::core::{Connector, ConnectorError, PlacedReservation};
///
/// struct YarnConnector { /* client handle */ }
///
/// #[async_trait]
/// impl Connector for YarnConnector {
///     async fn reserve(&self, id: ReservationId, reservation: &Reservation)
///         -> Result<PlacedReservation, ConnectorError> {
///         // negotiate with the resource manager
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Static configuration. Readable in every lifecycle state.
    fn config(&self) -> &BrokerConfig;

    /// Connect to the resource manager.
    async fn start(&self) -> Result<(), ConnectorError>;

    /// Disconnect and invalidate outstanding reservations. Best-effort.
    async fn stop(&self) -> Result<(), ConnectorError>;

    /// Connector-reported running state.
    fn is_running(&self) -> bool;

    /// Nodes reservations can be placed on.
    async fn nodes(&self) -> Result<Vec<NodeId>, ConnectorError>;

    /// Place `reservation` under `id`.
    async fn reserve(
        &self,
        id: ReservationId,
        reservation: &Reservation,
    ) -> Result<PlacedReservation, ConnectorError>;

    /// Release a reservation, returning its final record if it was known.
    async fn release_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<PlacedReservation>, ConnectorError>;

    /// Look up a reservation.
    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<PlacedReservation>, ConnectorError>;

    /// Release every reservation submitted under `handle`.
    async fn release_reservations_for_handle(
        &self,
        handle: Handle,
    ) -> Result<Vec<PlacedReservation>, ConnectorError>;

    /// Register a placement-change listener.
    async fn add_listener(&self, listener: SharedListener) -> Result<(), ConnectorError>;

    /// Deregister a placement-change listener.
    async fn remove_listener(&self, listener: &SharedListener) -> Result<(), ConnectorError>;
}
