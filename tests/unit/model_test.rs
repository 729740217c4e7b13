//! Tests for reservation value types

use prometheus_reservation_broker::core::{
    Handle, Locality, PlacedReservation, PlacedResourceStatus, PlacementStatus, Reservation,
    ReservationId, Resource,
};
use uuid::Uuid;

fn reservation(resources: usize) -> Reservation {
    let resources = (0..resources)
        .map(|_| Resource::new(Uuid::new_v4(), "node-1", Locality::PreferredHave, 1, 256).unwrap())
        .collect();
    Reservation::new(Handle::new_v4(), "default", resources, false).unwrap()
}

#[test]
fn test_nil_identifiers() {
    assert!(ReservationId::nil().is_nil());
    assert!(Handle::nil().is_nil());
    assert!(!ReservationId::new_v4().is_nil());
    assert_ne!(ReservationId::new_v4(), ReservationId::new_v4());
    assert!(ReservationId::from(Uuid::nil()).is_nil());
}

#[test]
fn test_reservation_id_serializes_as_plain_uuid() {
    let uuid = Uuid::new_v4();
    let json = serde_json::to_string(&ReservationId::from(uuid)).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));
}

#[test]
fn test_locality_requires_location() {
    let err = Resource::new(Uuid::new_v4(), "", Locality::MustHave, 1, 1).unwrap_err();
    assert!(err.is_argument());
    assert!(Resource::new(Uuid::new_v4(), "", Locality::DontCare, 1, 1).is_ok());
}

#[test]
fn test_nil_handle_rejected() {
    let resource = Resource::new(Uuid::new_v4(), "n", Locality::DontCare, 1, 1).unwrap();
    let err = Reservation::new(Handle::nil(), "q", vec![resource], false).unwrap_err();
    assert!(err.is_argument());
}

#[test]
fn test_deserialized_reservation_is_revalidated() {
    let json = serde_json::json!({
        "handle": Uuid::new_v4(),
        "queue": "",
        "resources": [],
        "gang": false
    });
    let reservation: Reservation = serde_json::from_value(json).unwrap();
    assert!(reservation.validate().is_err());
}

#[test]
fn test_pending_placement_mirrors_resources() {
    let reservation = reservation(3);
    let id = ReservationId::new_v4();
    let placed = PlacedReservation::pending(id, reservation.clone(), 42);

    assert_eq!(placed.id, id);
    assert_eq!(placed.handle(), reservation.handle());
    assert_eq!(placed.status, PlacementStatus::Pending);
    assert_eq!(placed.placed_at_ms, 42);
    assert_eq!(placed.resources.len(), 3);
    assert!(placed
        .resources
        .iter()
        .all(|r| r.status == PlacedResourceStatus::Pending && r.node.is_none()));
}

#[test]
fn test_aggregate_status() {
    let mut placed = PlacedReservation::pending(ReservationId::new_v4(), reservation(2), 0);

    placed.resources[0].status = PlacedResourceStatus::Allocated;
    placed.refresh_status();
    assert_eq!(placed.status, PlacementStatus::Partial);

    placed.resources[1].status = PlacedResourceStatus::Allocated;
    placed.refresh_status();
    assert_eq!(placed.status, PlacementStatus::Allocated);

    placed.resources[1].status = PlacedResourceStatus::Rejected;
    placed.refresh_status();
    assert_eq!(placed.status, PlacementStatus::Rejected);

    for r in &mut placed.resources {
        r.status = PlacedResourceStatus::Released;
    }
    placed.refresh_status();
    assert_eq!(placed.status, PlacementStatus::Released);
}
