//! Reservation value types.
//!
//! [`Resource`] and [`Reservation`] are built by callers and never mutated
//! afterwards; [`PlacedReservation`] is only ever produced by a connector.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::BrokerError;

/// Name of a cluster node.
pub type NodeId = String;

/// Broker-assigned reservation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil identifier, treated as an absent argument.
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the nil identifier.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ReservationId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque client-session identifier grouping reservations for bulk release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(Uuid);

impl Handle {
    /// Generate a fresh random handle.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil handle, treated as an absent argument.
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the nil handle.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for Handle {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How strictly a resource is bound to its requested location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locality {
    /// Only the requested node is acceptable.
    MustHave,
    /// The requested node is tried first, any other node is acceptable.
    PreferredHave,
    /// Any node is acceptable.
    DontCare,
}

/// A single resource ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    client_resource_id: Uuid,
    location: NodeId,
    locality: Locality,
    cpu_vcores: u32,
    memory_mb: u64,
}

impl Resource {
    /// Create a resource ask.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Argument`] if the ask requests no capacity or
    /// is bound to a location without naming one.
    pub fn new(
        client_resource_id: Uuid,
        location: impl Into<NodeId>,
        locality: Locality,
        cpu_vcores: u32,
        memory_mb: u64,
    ) -> Result<Self, BrokerError> {
        let resource = Self {
            client_resource_id,
            location: location.into(),
            locality,
            cpu_vcores,
            memory_mb,
        };
        resource.validate()?;
        Ok(resource)
    }

    /// Check resource invariants.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Argument`] describing the first violation.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.cpu_vcores == 0 && self.memory_mb == 0 {
            return Err(BrokerError::Argument(
                "resource must request cpu or memory".into(),
            ));
        }
        if self.locality != Locality::DontCare && self.location.trim().is_empty() {
            return Err(BrokerError::Argument(
                "resource with locality constraint must name a location".into(),
            ));
        }
        Ok(())
    }

    /// Client-assigned resource identifier.
    #[must_use]
    pub const fn client_resource_id(&self) -> Uuid {
        self.client_resource_id
    }

    /// Requested node.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Locality constraint.
    #[must_use]
    pub const fn locality(&self) -> Locality {
        self.locality
    }

    /// Requested virtual cores.
    #[must_use]
    pub const fn cpu_vcores(&self) -> u32 {
        self.cpu_vcores
    }

    /// Requested memory in megabytes.
    #[must_use]
    pub const fn memory_mb(&self) -> u64 {
        self.memory_mb
    }
}

/// A caller's request for one or more resources under a named queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    handle: Handle,
    queue: String,
    resources: Vec<Resource>,
    gang: bool,
}

impl Reservation {
    /// Create a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Argument`] if the queue name is empty, there
    /// are no resources, or any resource is malformed.
    pub fn new(
        handle: Handle,
        queue: impl Into<String>,
        resources: Vec<Resource>,
        gang: bool,
    ) -> Result<Self, BrokerError> {
        let reservation = Self {
            handle,
            queue: queue.into(),
            resources,
            gang,
        };
        reservation.validate()?;
        Ok(reservation)
    }

    /// Check reservation invariants.
    ///
    /// Deserialized reservations bypass [`Reservation::new`], so the broker
    /// re-checks them before delegation.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Argument`] describing the first violation.
    pub fn validate(&self) -> Result<(), BrokerError> {
        if self.handle.is_nil() {
            return Err(BrokerError::Argument("reservation handle cannot be nil".into()));
        }
        if self.queue.trim().is_empty() {
            return Err(BrokerError::Argument("reservation queue cannot be empty".into()));
        }
        if self.resources.is_empty() {
            return Err(BrokerError::Argument(
                "reservation must contain at least one resource".into(),
            ));
        }
        self.resources.iter().try_for_each(Resource::validate)
    }

    /// Client session this reservation belongs to.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// Target queue.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Requested resources, in submission order.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// All-or-nothing placement flag.
    #[must_use]
    pub const fn is_gang(&self) -> bool {
        self.gang
    }
}

/// Placement state of a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacedResourceStatus {
    /// Waiting for capacity.
    Pending,
    /// Bound to a node.
    Allocated,
    /// Can never be satisfied.
    Rejected,
    /// Returned to the cluster.
    Released,
}

/// A resource ask together with its placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedResource {
    /// The original ask.
    pub resource: Resource,
    /// Current placement state.
    pub status: PlacedResourceStatus,
    /// Node holding the allocation, once allocated.
    pub node: Option<NodeId>,
}

impl PlacedResource {
    /// A not-yet-placed resource.
    #[must_use]
    pub const fn pending(resource: Resource) -> Self {
        Self {
            resource,
            status: PlacedResourceStatus::Pending,
            node: None,
        }
    }
}

/// Aggregate placement state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    /// Nothing allocated yet.
    Pending,
    /// Some resources allocated, others pending.
    Partial,
    /// Every resource allocated.
    Allocated,
    /// The reservation can never be satisfied.
    Rejected,
    /// The reservation was released.
    Released,
}

impl PlacementStatus {
    /// Derive the aggregate status from per-resource states.
    #[must_use]
    pub fn from_resources(resources: &[PlacedResource]) -> Self {
        let count = |status: PlacedResourceStatus| {
            resources.iter().filter(|r| r.status == status).count()
        };
        let allocated = count(PlacedResourceStatus::Allocated);
        if count(PlacedResourceStatus::Released) == resources.len() {
            Self::Released
        } else if count(PlacedResourceStatus::Rejected) > 0 {
            Self::Rejected
        } else if allocated == resources.len() {
            Self::Allocated
        } else if allocated > 0 {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

/// The broker's record of a reservation bound to an identifier and a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedReservation {
    /// Broker-assigned identifier.
    pub id: ReservationId,
    /// The submitted reservation.
    pub reservation: Reservation,
    /// Aggregate placement state.
    pub status: PlacementStatus,
    /// Per-resource placement, in the reservation's resource order.
    pub resources: Vec<PlacedResource>,
    /// Time the reservation was placed (ms since epoch).
    pub placed_at_ms: u128,
}

impl PlacedReservation {
    /// A placed reservation with every resource pending.
    #[must_use]
    pub fn pending(id: ReservationId, reservation: Reservation, placed_at_ms: u128) -> Self {
        let resources = reservation
            .resources()
            .iter()
            .cloned()
            .map(PlacedResource::pending)
            .collect();
        Self {
            id,
            reservation,
            status: PlacementStatus::Pending,
            resources,
            placed_at_ms,
        }
    }

    /// Recompute the aggregate status from per-resource states.
    pub fn refresh_status(&mut self) {
        self.status = PlacementStatus::from_resources(&self.resources);
    }

    /// Client session of the underlying reservation.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.reservation.handle()
    }
}
