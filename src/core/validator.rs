//! Argument checks applied after the lifecycle gate and before delegation.

use crate::core::{BrokerError, Handle, Reservation, ReservationId};

/// Reject the nil reservation identifier.
///
/// # Errors
///
/// Returns [`BrokerError::Argument`] if `id` is nil.
pub fn require_reservation_id(id: &ReservationId) -> Result<(), BrokerError> {
    if id.is_nil() {
        return Err(BrokerError::Argument("reservation id cannot be nil".into()));
    }
    Ok(())
}

/// Reject the nil handle.
///
/// # Errors
///
/// Returns [`BrokerError::Argument`] if `handle` is nil.
pub fn require_handle(handle: &Handle) -> Result<(), BrokerError> {
    if handle.is_nil() {
        return Err(BrokerError::Argument("handle cannot be nil".into()));
    }
    Ok(())
}

/// Reject malformed reservations.
///
/// # Errors
///
/// Returns [`BrokerError::Argument`] if the reservation breaks an invariant.
pub fn require_reservation(reservation: &Reservation) -> Result<(), BrokerError> {
    reservation.validate()
}

/// Check an explicit-id reservation request. The id is checked first.
///
/// # Errors
///
/// Returns [`BrokerError::Argument`] for the first invalid argument.
pub fn require_reserve_args(
    id: &ReservationId,
    reservation: &Reservation,
) -> Result<(), BrokerError> {
    require_reservation_id(id)?;
    require_reservation(reservation)
}
