//! Core broker abstractions: reservation model, connector seam, lifecycle and
//! contract enforcement.

pub mod broker;
pub mod connector;
pub mod error;
pub mod lifecycle;
pub mod listener;
pub mod model;
pub mod validator;

pub use broker::ContractBroker;
pub use connector::Connector;
pub use error::{AppResult, BrokerError, BrokerResult, ConnectorError};
pub use lifecycle::{Lifecycle, LifecycleState, StartOutcome};
pub use listener::{
    same_listener, ListenerRegistry, ReservationEvent, ReservationListener, SharedListener,
};
pub use model::{
    Handle, Locality, NodeId, PlacedReservation, PlacedResource, PlacedResourceStatus,
    PlacementStatus, Reservation, ReservationId, Resource,
};
