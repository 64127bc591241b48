#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use dispatch_core::clock::SimulationClock;
use dispatch_core::runner::{dispatch_schedule, run_next_event, run_until, run_until_empty};

/// Helper that owns a reusable `Schedule` so tests can step or advance the clock.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default dispatch schedule.
    pub fn new() -> Self {
        Self {
            schedule: dispatch_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule)
    }

    /// Run every event up to and including `end_ms`.
    pub fn run_until(&mut self, world: &mut World, end_ms: u64) -> usize {
        run_until(world, &mut self.schedule, end_ms)
    }

    /// Run multiple events up to `max_steps`, returning the number of steps executed.
    pub fn run_until_empty(&mut self, world: &mut World, max_steps: usize) -> usize {
        run_until_empty(world, &mut self.schedule, max_steps)
    }

    /// Current simulation time.
    pub fn now(world: &World) -> u64 {
        world.resource::<SimulationClock>().now()
    }
}
