//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule to completion on a single thread.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, ExecutorKind, IntoSystemConfigs};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::systems::{
    assignment::assignment_system,
    movement::{movement_system, passenger_wait_system},
    patrol::patrol_system,
    spawner::{passenger_spawner_system, simulation_started_system},
};

fn is_event(event: &Option<Res<CurrentEvent>>, kind: EventKind) -> bool {
    event.as_ref().is_some_and(|e| e.0.kind == kind)
}

fn is_simulation_started(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(&event, EventKind::SimulationStarted)
}

fn is_spawn_passenger(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(&event, EventKind::SpawnPassenger)
}

fn is_movement_tick(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(&event, EventKind::MovementTick)
}

fn is_patrol_step(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(&event, EventKind::PatrolStep)
}

fn is_assignment_tick(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(&event, EventKind::AssignmentTick)
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `false` if the clock was empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Processes every event with a timestamp at or before `end_ms`.
/// Returns the number of steps executed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, end_ms: u64) -> usize {
    let mut steps = 0;
    while world
        .resource::<SimulationClock>()
        .next_event_time()
        .is_some_and(|ts| ts <= end_ms)
    {
        if !run_next_event(world, schedule) {
            break;
        }
        steps += 1;
    }
    steps
}

/// Runs simulation steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Builds the dispatch schedule: one system group per event kind plus
/// [apply_deferred] so spawned and despawned passengers are visible to the
/// next step.
pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);

    schedule.add_systems(
        (
            simulation_started_system.run_if(is_simulation_started),
            passenger_spawner_system.run_if(is_spawn_passenger),
            (movement_system, passenger_wait_system)
                .chain()
                .run_if(is_movement_tick),
            patrol_system.run_if(is_patrol_step),
            assignment_system.run_if(is_assignment_tick),
            apply_deferred,
        )
            .chain(),
    );

    schedule
}

/// Schedules the SimulationStarted event at the current time.
/// Call this after building the scenario and before running events.
pub fn initialize_simulation(world: &mut World) {
    let mut clock = world.resource_mut::<SimulationClock>();
    let now = clock.now();
    clock.schedule_at(now, EventKind::SimulationStarted);
}
