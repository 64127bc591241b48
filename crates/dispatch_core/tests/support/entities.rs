#![allow(dead_code)]

use bevy_ecs::prelude::World;
use dispatch_core::ecs::{
    Passenger, PassengerId, PassengerStatus, Position, Taxi, TaxiId, TaxiState, VulnerableCategory,
};
use dispatch_core::grid::GridPosition;
use dispatch_core::scenario::{spawn_passenger, spawn_request};
use dispatch_core::spawner::TripRequest;

/// Spawn a waiting passenger between two intersections.
pub fn spawn_trip(world: &mut World, pickup: (i32, i32), dropoff: (i32, i32)) -> PassengerId {
    spawn_passenger(world, pickup.into(), dropoff.into(), None)
}

/// Spawn a waiting passenger flagged with a vulnerability.
pub fn spawn_vulnerable_trip(
    world: &mut World,
    pickup: (i32, i32),
    dropoff: (i32, i32),
    category: VulnerableCategory,
) -> PassengerId {
    spawn_passenger(world, pickup.into(), dropoff.into(), Some(category))
}

/// Spawn a waiting party of `party_size` riders sharing one trip.
pub fn spawn_party_trip(
    world: &mut World,
    pickup: (i32, i32),
    dropoff: (i32, i32),
    party_size: u32,
) -> PassengerId {
    let request = TripRequest {
        party_size,
        ..TripRequest::new(pickup.into(), dropoff.into())
    };
    spawn_request(world, &request)
}

/// Clone of the taxi with the given id.
pub fn taxi(world: &mut World, id: TaxiId) -> Taxi {
    world
        .query::<&Taxi>()
        .iter(world)
        .find(|t| t.id == id)
        .cloned()
        .expect("taxi should exist")
}

/// Current intersection of the taxi with the given id.
pub fn taxi_position(world: &mut World, id: TaxiId) -> GridPosition {
    world
        .query::<(&Taxi, &Position)>()
        .iter(world)
        .find(|(t, _)| t.id == id)
        .map(|(_, p)| p.0)
        .expect("taxi should exist")
}

/// Clone of the passenger with the given id, if still in the world.
pub fn passenger(world: &mut World, id: PassengerId) -> Option<Passenger> {
    world
        .query::<&Passenger>()
        .iter(world)
        .find(|p| p.id == id)
        .cloned()
}

/// Taxi summary tuple used in assertions: (state, load, target).
pub fn taxi_state(world: &mut World, id: TaxiId) -> (TaxiState, u32, Option<GridPosition>) {
    let taxi = taxi(world, id);
    (taxi.state, taxi.current_load, taxi.target)
}

/// Status of the passenger with the given id, if still in the world.
pub fn passenger_status(world: &mut World, id: PassengerId) -> Option<PassengerStatus> {
    passenger(world, id).map(|p| p.status)
}

/// Number of passengers currently in the world.
pub fn passenger_count(world: &mut World) -> usize {
    world.query::<&Passenger>().iter(world).count()
}
