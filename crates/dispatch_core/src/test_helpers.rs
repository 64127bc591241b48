//! Test helpers for common test setup and utilities.
//!
//! Shared by unit tests, integration tests and benches so fixtures stay consistent.

use bevy_ecs::prelude::World;

use crate::config::DispatchConfig;
use crate::ecs::{PassengerId, TaxiId};
use crate::grid::GridPosition;
use crate::matching::{PassengerRequest, TaxiCandidate};
use crate::scenario::build_scenario;

/// Seed used by fixtures that need determinism but do not care about the value.
pub const TEST_SEED: u64 = 42;

/// Default grid and timing with every source of background activity switched
/// off: no initial passengers, no top-ups, no respawns, no patrol.
pub fn quiet_config() -> DispatchConfig {
    DispatchConfig::default()
        .with_seed(TEST_SEED)
        .without_background_activity()
}

/// Quiet world with a fleet at the given intersections.
///
/// # Panics
///
/// Panics if the positions fall outside the default grid.
pub fn quiet_world(fleet: &[(i32, i32)]) -> World {
    let config = quiet_config().with_fleet(fleet.iter().map(|&p| GridPosition::from(p)).collect());
    let mut world = World::new();
    build_scenario(&mut world, &config).expect("quiet scenario should build");
    world
}

/// Empty-handed idle taxi candidate with the default capacity of four.
pub fn taxi_at(id: u32, x: i32, y: i32) -> TaxiCandidate {
    TaxiCandidate {
        id: TaxiId(id),
        position: GridPosition::new(x, y),
        current_load: 0,
        capacity: 4,
    }
}

/// Freshly spawned regular passenger request.
pub fn request_at(id: u64, x: i32, y: i32) -> PassengerRequest {
    PassengerRequest {
        id: PassengerId(id),
        pickup: GridPosition::new(x, y),
        wait_time_ms: 0,
        vulnerable: false,
        search_radius_multiplier: 1.0,
        party_size: 1,
    }
}

/// Same as [request_at] but flagged vulnerable.
pub fn vulnerable_request_at(id: u64, x: i32, y: i32) -> PassengerRequest {
    PassengerRequest {
        vulnerable: true,
        ..request_at(id, x, y)
    }
}
