//! Placement-change notifications and listener bookkeeping.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::{Handle, PlacedReservation, PlacementStatus, ReservationId};

/// A change in a reservation's placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationEvent {
    /// Snapshot of the reservation after the change.
    pub placed: PlacedReservation,
    /// Emission time (ms since epoch).
    pub emitted_at_ms: u128,
}

impl ReservationEvent {
    /// Build an event from a reservation snapshot.
    #[must_use]
    pub fn new(placed: PlacedReservation) -> Self {
        Self {
            placed,
            emitted_at_ms: crate::util::clock::now_ms(),
        }
    }

    /// Reservation the event refers to.
    #[must_use]
    pub const fn reservation_id(&self) -> ReservationId {
        self.placed.id
    }

    /// Client session owning the reservation.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.placed.handle()
    }

    /// Status after the change.
    #[must_use]
    pub const fn status(&self) -> PlacementStatus {
        self.placed.status
    }
}

/// Receiver of asynchronous placement-change notifications.
///
/// Called from the connector's delivery thread; implementations must not
/// block for long.
pub trait ReservationListener: Send + Sync {
    /// Handle a placement change.
    fn on_event(&self, event: &ReservationEvent);
}

/// Shared listener handle as registered with a broker.
pub type SharedListener = Arc<dyn ReservationListener>;

/// Identity comparison on the listener allocation, ignoring vtables.
#[must_use]
pub fn same_listener(a: &SharedListener, b: &SharedListener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Registered listeners, compared by identity.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<SharedListener>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registering the same listener twice delivers
    /// every event to it twice.
    pub fn add(&self, listener: SharedListener) {
        self.listeners.write().push(listener);
    }

    /// Remove one registration of `listener`. Returns whether one was found.
    pub fn remove(&self, listener: &SharedListener) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|l| same_listener(l, listener)) {
            Some(idx) => {
                listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Copy of the current registrations, taken so delivery runs unlocked.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SharedListener> {
        self.listeners.read().clone()
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}
