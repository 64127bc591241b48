use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{EventKind, SimulationClock};
use crate::config::{FleetConfig, PatrolMode, TimingConfig};
use crate::ecs::{DispatchRng, Patrol, Position, Taxi};
use crate::events::{DispatchEvent, OutboundEvents};
use crate::grid::GridNetwork;
use crate::motion::patrol_step;

/// Random-walk step for idle taxis. Busy taxis are never touched.
pub fn patrol_system(
    mut clock: ResMut<SimulationClock>,
    timing: Res<TimingConfig>,
    fleet: Res<FleetConfig>,
    grid: Res<GridNetwork>,
    mut rng: ResMut<DispatchRng>,
    mut outbound: ResMut<OutboundEvents>,
    mut taxis: Query<(&Taxi, &mut Position, &mut Patrol)>,
) {
    if fleet.patrol != PatrolMode::RandomWalk {
        return;
    }
    let now = clock.now();
    for (taxi, mut position, mut patrol) in taxis.iter_mut() {
        if !taxi.is_idle() {
            continue;
        }
        if let Some((from, to)) = patrol_step(&mut position, &mut patrol, &grid, &mut rng.0) {
            outbound.push(
                now,
                DispatchEvent::TaxiMoved {
                    taxi: taxi.id,
                    from,
                    to,
                },
            );
        }
    }
    clock.schedule_in(timing.patrol_interval_ms, EventKind::PatrolStep);
}
