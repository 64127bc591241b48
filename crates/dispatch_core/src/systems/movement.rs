//! Movement system: advances busy taxis one lattice node per tick and fires
//! pickup and dropoff transitions on arrival.

use bevy_ecs::prelude::{Commands, Entity, Query, Res, ResMut};
use tracing::{error, info, warn};

use crate::clock::{EventKind, SimulationClock};
use crate::config::{PassengerConfig, TimingConfig};
use crate::ecs::{Passenger, Position, Route, Taxi, TaxiState};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::grid::GridNetwork;
use crate::lifecycle::accrue_wait;
use crate::motion::{advance, complete_dropoff, complete_pickup, release};
use crate::telemetry::{CompletedTripRecord, DispatchTelemetry};

#[allow(clippy::too_many_arguments)]
pub fn movement_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    timing: Res<TimingConfig>,
    passenger_config: Res<PassengerConfig>,
    grid: Res<GridNetwork>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut outbound: ResMut<OutboundEvents>,
    mut taxis: Query<(&mut Taxi, &mut Position, &mut Route)>,
    mut passengers: Query<(Entity, &mut Passenger)>,
) {
    let now = clock.now();

    for (mut taxi, mut position, mut route) in taxis.iter_mut() {
        if taxi.is_idle() {
            continue;
        }
        let outcome = match advance(&taxi, &mut position, &mut route, &grid) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(taxi = %taxi.id, error = %err, "route recomputation failed");
                continue;
            }
        };
        if let Some((from, to)) = outcome.moved {
            outbound.push(
                now,
                DispatchEvent::TaxiMoved {
                    taxi: taxi.id,
                    from,
                    to,
                },
            );
        }
        if !outcome.arrived {
            continue;
        }

        let Some(passenger_id) = taxi.assigned_passenger else {
            warn!(taxi = %taxi.id, "busy taxi has no assigned passenger; releasing");
            release(&mut taxi, &mut route);
            continue;
        };
        let assigned = passengers.iter_mut().find(|(_, p)| p.id == passenger_id);

        match taxi.state {
            TaxiState::Pickup => {
                let Some((_, mut passenger)) = assigned else {
                    warn!(taxi = %taxi.id, passenger = %passenger_id, "assigned passenger vanished; releasing");
                    release(&mut taxi, &mut route);
                    continue;
                };
                match complete_pickup(&mut taxi, &position, &mut route, &mut passenger, &grid, now) {
                    Ok(()) => outbound.push(
                        now,
                        DispatchEvent::PassengerPickedUp {
                            passenger: passenger_id,
                            taxi: taxi.id,
                        },
                    ),
                    Err(err) => {
                        error!(taxi = %taxi.id, passenger = %passenger_id, error = %err, "pickup failed");
                    }
                }
            }
            TaxiState::Dropoff => {
                let taxi_id = taxi.id;
                // A rider that vanished mid-trip leaves its whole party's seats behind.
                let party_size = assigned
                    .as_ref()
                    .map_or(taxi.current_load, |(_, passenger)| passenger.party_size);
                complete_dropoff(&mut taxi, &mut route, party_size);
                if let Some((entity, passenger)) = assigned {
                    telemetry.completed_trips.push(CompletedTripRecord {
                        passenger: passenger.id,
                        taxi: taxi_id,
                        vulnerable: passenger.vulnerable,
                        party_size: passenger.party_size,
                        spawned_at: passenger.spawned_at,
                        matched_at: passenger.matched_at.unwrap_or(passenger.spawned_at),
                        picked_up_at: passenger.picked_up_at.unwrap_or(now),
                        dropped_off_at: now,
                        wait_time_ms: passenger.wait_time_ms,
                        trip_distance: passenger.trip_distance(),
                    });
                    commands.entity(entity).despawn();
                }
                outbound.push(
                    now,
                    DispatchEvent::PassengerDroppedOff {
                        passenger: passenger_id,
                        taxi: taxi_id,
                    },
                );
                if passenger_config.respawn_on_dropoff {
                    clock.schedule_in(passenger_config.respawn_delay_ms, EventKind::SpawnPassenger);
                }
                info!(taxi = %taxi_id, passenger = %passenger_id, at = %position.0, "trip completed");
            }
            TaxiState::Idle => {}
        }
    }

    clock.schedule_in(timing.tick_ms, EventKind::MovementTick);
}

/// Accrues one tick of waiting for every unmatched passenger.
pub fn passenger_wait_system(
    timing: Res<TimingConfig>,
    config: Res<PassengerConfig>,
    mut passengers: Query<&mut Passenger>,
) {
    for mut passenger in passengers.iter_mut() {
        if passenger.is_waiting() {
            accrue_wait(&mut passenger, timing.tick_ms, &config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::{Schedule, World};

    use crate::config::DispatchConfig;
    use crate::ecs::PassengerStatus;
    use crate::grid::GridPosition;
    use crate::motion::begin_pickup;
    use crate::scenario::{build_scenario, spawn_passenger};

    fn world_with_assigned_taxi(pickup: GridPosition, dropoff: GridPosition) -> World {
        let mut world = World::new();
        let config = DispatchConfig::default()
            .with_fleet(vec![GridPosition::new(0, 0)])
            .without_background_activity()
            .with_respawn(true, 2_000);
        build_scenario(&mut world, &config).expect("scenario");
        spawn_passenger(&mut world, pickup, dropoff, None);

        let grid = world.resource::<GridNetwork>().clone();
        let mut passenger = world.query::<&Passenger>().single(&world).clone();
        let mut query = world.query::<(&mut Taxi, &Position, &mut Route)>();
        let (mut taxi, position, mut route) = query.single_mut(&mut world);
        begin_pickup(&mut taxi, position, &mut route, &mut passenger, &grid, 0).expect("assign");
        *world.query::<&mut Passenger>().single_mut(&mut world) = passenger;
        world
    }

    fn movement_schedule() -> Schedule {
        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule
    }

    #[test]
    fn taxi_steps_one_cell_per_tick_and_picks_up() {
        let mut world = world_with_assigned_taxi(GridPosition::new(0, 2), GridPosition::new(2, 2));
        let mut schedule = movement_schedule();

        schedule.run(&mut world);
        let position = world.query::<&Position>().single(&world).0;
        assert_eq!(position, GridPosition::new(0, 1));

        schedule.run(&mut world);
        let taxi = world.query::<&Taxi>().single(&world).clone();
        assert_eq!(taxi.state, TaxiState::Dropoff);
        assert_eq!(taxi.current_load, 1);
        let passenger = world.query::<&Passenger>().single(&world).clone();
        assert_eq!(passenger.status, PassengerStatus::Riding(taxi.id));
    }

    #[test]
    fn dropoff_despawns_passenger_and_schedules_respawn() {
        let mut world = world_with_assigned_taxi(GridPosition::new(0, 1), GridPosition::new(1, 1));
        let mut schedule = movement_schedule();
        for _ in 0..2 {
            schedule.run(&mut world);
        }

        let taxi = world.query::<&Taxi>().single(&world).clone();
        assert_eq!(taxi.state, TaxiState::Idle);
        assert_eq!(taxi.current_load, 0);
        assert_eq!(world.query::<&Passenger>().iter(&world).count(), 0);

        let telemetry = world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.completed_trips.len(), 1);
        assert_eq!(telemetry.completed_trips[0].trip_distance, 1);
        assert_eq!(
            world.resource::<SimulationClock>().pending(EventKind::SpawnPassenger),
            1
        );
    }

    #[test]
    fn wait_accrues_only_while_waiting() {
        let mut world = World::new();
        build_scenario(
            &mut world,
            &DispatchConfig::default().without_background_activity(),
        )
        .expect("scenario");
        spawn_passenger(&mut world, GridPosition::new(0, 0), GridPosition::new(4, 0), None);

        let mut schedule = Schedule::default();
        schedule.add_systems(passenger_wait_system);
        for _ in 0..6 {
            schedule.run(&mut world);
        }
        let passenger = world.query::<&Passenger>().single(&world).clone();
        assert_eq!(passenger.wait_time_ms, 6_000);
        assert_eq!(passenger.search_radius_multiplier, 1.5);

        world.query::<&mut Passenger>().single_mut(&mut world).status =
            PassengerStatus::Assigned(crate::ecs::TaxiId(0));
        schedule.run(&mut world);
        assert_eq!(world.query::<&Passenger>().single(&world).wait_time_ms, 6_000);
    }
}
