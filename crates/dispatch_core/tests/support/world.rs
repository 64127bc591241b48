#![allow(dead_code)]

use bevy_ecs::prelude::World;
use dispatch_core::config::{DispatchConfig, PatrolMode, SolverKind};
use dispatch_core::grid::GridPosition;
use dispatch_core::runner::initialize_simulation;
use dispatch_core::scenario::build_scenario;

/// Builder for reproducible test worlds.
///
/// Defaults to a quiet city: the default grid and timing, no background
/// passengers, no respawns and taxis that hold position while idle.
#[derive(Debug, Clone)]
pub struct TestWorldBuilder {
    config: DispatchConfig,
    fleet: Vec<GridPosition>,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self {
            config: DispatchConfig::default()
                .with_seed(42)
                .without_background_activity(),
            fleet: Vec::new(),
        }
    }
}

impl TestWorldBuilder {
    /// Create a new builder with the quiet defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config = self.config.with_seed(seed);
        self
    }

    /// Add one taxi at a lattice intersection.
    pub fn with_taxi_at(mut self, x: i32, y: i32) -> Self {
        self.fleet.push(GridPosition::new(x, y));
        self
    }

    /// Override the taxi capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.config = self.config.with_capacity(capacity);
        self
    }

    /// Choose the primary solver.
    pub fn with_solver(mut self, kind: SolverKind) -> Self {
        self.config = self.config.with_solver(kind);
        self
    }

    /// Let idle taxis random-walk.
    pub fn with_patrol(mut self, mode: PatrolMode) -> Self {
        self.config = self.config.with_patrol(mode);
        self
    }

    /// Apply arbitrary config changes.
    pub fn configure(mut self, f: impl FnOnce(DispatchConfig) -> DispatchConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// The config the world will be built from.
    pub fn config(&self) -> DispatchConfig {
        self.config.clone().with_fleet(self.fleet.clone())
    }

    /// Build the ECS world with the configured resources, without starting the clock.
    pub fn build(self) -> World {
        let mut world = World::new();
        build_scenario(&mut world, &self.config()).expect("test scenario should build");
        world
    }

    /// Build the world and schedule `SimulationStarted` at time zero.
    pub fn build_started(self) -> World {
        let mut world = self.build();
        initialize_simulation(&mut world);
        world
    }
}
