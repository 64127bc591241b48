//! Spawner systems: kick off the periodic events and regenerate passengers.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::{debug, warn};

use crate::clock::{EventKind, SimulationClock};
use crate::config::{FleetConfig, PassengerConfig, PatrolMode, TimingConfig};
use crate::ecs::{DispatchRng, EntityIds, Passenger};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::grid::GridNetwork;
use crate::spawner::sample_request;
use crate::telemetry::DispatchTelemetry;

/// Schedules the first movement tick, patrol step and assignment tick.
pub fn simulation_started_system(
    mut clock: ResMut<SimulationClock>,
    timing: Res<TimingConfig>,
    fleet: Res<FleetConfig>,
) {
    clock.schedule_in(timing.tick_ms, EventKind::MovementTick);
    clock.schedule_in(timing.assignment_interval_ms, EventKind::AssignmentTick);
    if fleet.patrol == PatrolMode::RandomWalk {
        clock.schedule_in(timing.patrol_interval_ms, EventKind::PatrolStep);
    }
}

/// Spawns one passenger, plus as many as needed to reach `min_waiting`.
#[allow(clippy::too_many_arguments)]
pub fn passenger_spawner_system(
    mut commands: Commands,
    clock: Res<SimulationClock>,
    grid: Res<GridNetwork>,
    config: Res<PassengerConfig>,
    mut rng: ResMut<DispatchRng>,
    mut ids: ResMut<EntityIds>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut outbound: ResMut<OutboundEvents>,
    passengers: Query<&Passenger>,
) {
    let now = clock.now();
    let waiting = passengers.iter().filter(|p| p.is_waiting()).count();
    let to_spawn = config.min_waiting.saturating_sub(waiting).max(1);

    for _ in 0..to_spawn {
        let request = match sample_request(&grid, &mut rng.0, &config) {
            Ok(request) => request,
            Err(err) => {
                telemetry.spawns_skipped += 1;
                warn!(error = %err, "passenger spawn skipped");
                continue;
            }
        };
        let id = ids.next_passenger();
        commands.spawn(
            Passenger::new(id, request.pickup, request.dropoff, request.vulnerable, now)
                .with_party_size(request.party_size),
        );
        telemetry.passengers_spawned += 1;
        outbound.push(
            now,
            DispatchEvent::PassengerSpawned {
                passenger: id,
                pickup: request.pickup,
                dropoff: request.dropoff,
                vulnerable: request.vulnerable,
                party_size: request.party_size,
            },
        );
        debug!(passenger = %id, pickup = %request.pickup, dropoff = %request.dropoff, vulnerable = ?request.vulnerable, party = request.party_size, "passenger spawned");
    }
}
