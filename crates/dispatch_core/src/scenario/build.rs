use bevy_ecs::prelude::{Entity, World};
use tracing::{info, warn};

use crate::clock::SimulationClock;
use crate::config::DispatchConfig;
use crate::ecs::{
    DispatchRng, EntityIds, Passenger, PassengerId, Patrol, Position, Route, Taxi, TaxiId,
    VulnerableCategory,
};
use crate::error::DispatchError;
use crate::events::{DispatchEvent, OutboundEvents};
use crate::grid::{GridNetwork, GridPosition};
use crate::matching::SolverResource;
use crate::spawner::{sample_request, TripRequest};
use crate::telemetry::DispatchTelemetry;

/// Spawns an idle taxi with a fresh id.
pub fn spawn_taxi(world: &mut World, position: GridPosition, capacity: u32) -> (TaxiId, Entity) {
    let id = world.resource_mut::<EntityIds>().next_taxi();
    let entity = world
        .spawn((
            Taxi::new(id, capacity),
            Position(position),
            Route::default(),
            Patrol::default(),
        ))
        .id();
    (id, entity)
}

/// Spawns a single waiting rider with a fresh id and announces it.
pub fn spawn_passenger(
    world: &mut World,
    pickup: GridPosition,
    dropoff: GridPosition,
    vulnerable: Option<VulnerableCategory>,
) -> PassengerId {
    spawn_request(
        world,
        &TripRequest {
            vulnerable,
            ..TripRequest::new(pickup, dropoff)
        },
    )
}

/// Spawns the passenger described by `request` and announces it.
pub fn spawn_request(world: &mut World, request: &TripRequest) -> PassengerId {
    let now = world.resource::<SimulationClock>().now();
    let id = world.resource_mut::<EntityIds>().next_passenger();
    world.spawn(
        Passenger::new(id, request.pickup, request.dropoff, request.vulnerable, now)
            .with_party_size(request.party_size),
    );
    world.resource_mut::<DispatchTelemetry>().passengers_spawned += 1;
    world.resource_mut::<OutboundEvents>().push(
        now,
        DispatchEvent::PassengerSpawned {
            passenger: id,
            pickup: request.pickup,
            dropoff: request.dropoff,
            vulnerable: request.vulnerable,
            party_size: request.party_size,
        },
    );
    id
}

/// Inserts every resource and spawns the starting fleet and passengers.
///
/// The initial population is the larger of `initial_count` and
/// `min_waiting`; trips that cannot be sampled are logged and skipped.
pub fn build_scenario(world: &mut World, config: &DispatchConfig) -> Result<(), DispatchError> {
    config.validate()?;
    let grid = GridNetwork::from_config(&config.grid)?;

    world.insert_resource(SimulationClock::default());
    world.insert_resource(grid.clone());
    world.insert_resource(config.grid.clone());
    world.insert_resource(config.timing.clone());
    world.insert_resource(config.solver.clone());
    world.insert_resource(config.passengers.clone());
    world.insert_resource(config.fleet.clone());
    world.insert_resource(config.events.clone());
    world.insert_resource(SolverResource::from_config(&config.solver));
    world.insert_resource(DispatchRng::seeded(config.seed));
    world.insert_resource(EntityIds::default());
    world.insert_resource(DispatchTelemetry::default());
    world.insert_resource(OutboundEvents::new(&config.events));

    for position in &config.fleet.starting_positions {
        spawn_taxi(world, *position, config.fleet.capacity);
    }
    for _ in 0..config.fleet.random_taxis {
        let position = grid.random_valid_position(&mut world.resource_mut::<DispatchRng>().0);
        spawn_taxi(world, position, config.fleet.capacity);
    }

    let initial = config
        .passengers
        .initial_count
        .max(config.passengers.min_waiting);
    for _ in 0..initial {
        let sampled = sample_request(
            &grid,
            &mut world.resource_mut::<DispatchRng>().0,
            &config.passengers,
        );
        match sampled {
            Ok(request) => {
                spawn_request(world, &request);
            }
            Err(err) => {
                world.resource_mut::<DispatchTelemetry>().spawns_skipped += 1;
                warn!(error = %err, "initial passenger skipped");
            }
        }
    }

    info!(
        taxis = config.fleet.starting_positions.len() + config.fleet.random_taxis,
        passengers = initial,
        solver = world.resource::<SolverResource>().primary_name(),
        seed = config.seed,
        "scenario built"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatrolMode;

    #[test]
    fn builds_fleet_and_initial_passengers() {
        let mut world = World::new();
        let config = DispatchConfig::default()
            .with_initial_passengers(2)
            .with_min_waiting_passengers(5)
            .with_random_taxis(2)
            .with_patrol(PatrolMode::Hold);
        build_scenario(&mut world, &config).expect("scenario builds");

        let taxis: Vec<TaxiId> = world.query::<&Taxi>().iter(&world).map(|t| t.id).collect();
        assert_eq!(taxis.len(), 5);
        let grid = world.resource::<GridNetwork>().clone();
        for position in world.query::<&Position>().iter(&world) {
            assert!(grid.contains(position.0));
        }
        assert_eq!(world.query::<&Passenger>().iter(&world).count(), 5);
        assert_eq!(world.resource::<OutboundEvents>().len(), 5);
        assert_eq!(world.resource::<DispatchTelemetry>().passengers_spawned, 5);
    }

    #[test]
    fn initial_parties_follow_the_configured_range() {
        let mut world = World::new();
        let config = DispatchConfig::default()
            .with_min_waiting_passengers(40)
            .with_party_sizes(2, 3)
            .with_events(false, 0)
            .with_patrol(PatrolMode::Hold);
        build_scenario(&mut world, &config).expect("scenario builds");

        let sizes: Vec<u32> = world
            .query::<&Passenger>()
            .iter(&world)
            .map(|p| p.party_size)
            .collect();
        assert_eq!(sizes.len(), 40);
        assert!(sizes.iter().all(|size| (2..=3).contains(size)));
        assert!(world.resource::<OutboundEvents>().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut world = World::new();
        let config = DispatchConfig::default().with_capacity(0);
        assert!(matches!(
            build_scenario(&mut world, &config),
            Err(DispatchError::Config(_))
        ));
    }
}
