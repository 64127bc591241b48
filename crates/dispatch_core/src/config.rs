//! Dispatch configuration: lattice, cadences, solver limits, passenger
//! lifecycle and fleet layout.
//!
//! Every section is a bevy [Resource] so systems read only the part they
//! need. [DispatchConfig] bundles them for TOML loading and validation.

use std::path::Path;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::{GridPosition, MAX_GRID_SPAN};

/// Default lattice half-extent (indices run from -5 to 5 on both axes).
const DEFAULT_HALF_EXTENT: i32 = 5;

/// Default exact-solver budget in candidate pairs (taxis x passengers per tier).
const DEFAULT_MAX_EXACT_PAIRS: usize = 250_000;

/// Default number of undrained outbound events kept before the oldest are dropped.
const DEFAULT_EVENT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct GridConfig {
    /// World units between adjacent intersections.
    pub cell_size: f64,
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl GridConfig {
    pub fn min(&self) -> GridPosition {
        GridPosition::new(self.min_x, self.min_y)
    }

    pub fn max(&self) -> GridPosition {
        GridPosition::new(self.max_x, self.max_y)
    }

    fn contains(&self, position: GridPosition) -> bool {
        (self.min_x..=self.max_x).contains(&position.x)
            && (self.min_y..=self.max_y).contains(&position.y)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 20.0,
            min_x: -DEFAULT_HALF_EXTENT,
            min_y: -DEFAULT_HALF_EXTENT,
            max_x: DEFAULT_HALF_EXTENT,
            max_y: DEFAULT_HALF_EXTENT,
        }
    }
}

/// Event cadences in simulation milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct TimingConfig {
    /// Movement tick: one lattice step per busy taxi, one wait accrual per waiting passenger.
    pub tick_ms: u64,
    pub assignment_interval_ms: u64,
    pub patrol_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1_000,
            assignment_interval_ms: 2_000,
            patrol_interval_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Kuhn-Munkres with greedy fallback.
    #[default]
    Hungarian,
    Greedy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SolverConfig {
    pub kind: SolverKind,
    /// Base pickup reach in cells, scaled by the passenger's search radius multiplier.
    pub max_pickup_distance: u32,
    /// Cost added per second a passenger has waited.
    pub wait_penalty_factor: f64,
    /// Candidate pairs above which the exact solver refuses and greedy takes over.
    pub max_exact_pairs: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::Hungarian,
            max_pickup_distance: 15,
            wait_penalty_factor: 2.0,
            max_exact_pairs: DEFAULT_MAX_EXACT_PAIRS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct PassengerConfig {
    /// Passengers spawned when the world is built.
    pub initial_count: usize,
    /// Spawn events top the waiting population up to this size.
    pub min_waiting: usize,
    pub min_trip_distance: u32,
    pub vulnerable_probability: f64,
    pub respawn_on_dropoff: bool,
    pub respawn_delay_ms: u64,
    pub radius_growth_interval_ms: u64,
    pub radius_growth_step: f64,
    /// Upper bound on the search radius multiplier; `None` grows without limit.
    pub max_search_radius_multiplier: Option<f64>,
    /// Rejection-sampling budget for a pickup/dropoff pair.
    pub max_spawn_attempts: u32,
    /// Party size is drawn uniformly from `min_party_size..=max_party_size`.
    pub min_party_size: u32,
    pub max_party_size: u32,
}

impl Default for PassengerConfig {
    fn default() -> Self {
        Self {
            initial_count: 4,
            min_waiting: 4,
            min_trip_distance: 3,
            vulnerable_probability: 0.15,
            respawn_on_dropoff: true,
            respawn_delay_ms: 2_000,
            radius_growth_interval_ms: 5_000,
            radius_growth_step: 0.5,
            max_search_radius_multiplier: None,
            max_spawn_attempts: 100,
            min_party_size: 1,
            max_party_size: 1,
        }
    }
}

/// Outbound event queue. Hosts that never drain should disable it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,
    /// Undrained events kept; the oldest are dropped beyond this.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatrolMode {
    /// Idle taxis stay where they dropped off.
    Hold,
    /// Idle taxis take a random cardinal step each patrol interval.
    #[default]
    RandomWalk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct FleetConfig {
    pub capacity: u32,
    /// Fixed starting intersections, one taxi each.
    pub starting_positions: Vec<GridPosition>,
    /// Extra taxis placed at random intersections.
    pub random_taxis: usize,
    pub patrol: PatrolMode,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            starting_positions: vec![
                GridPosition::new(-4, -4),
                GridPosition::new(4, 4),
                GridPosition::new(0, 0),
            ],
            random_taxis: 0,
            patrol: PatrolMode::RandomWalk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub seed: u64,
    pub grid: GridConfig,
    pub timing: TimingConfig,
    pub solver: SolverConfig,
    pub passengers: PassengerConfig,
    pub fleet: FleetConfig,
    pub events: EventsConfig,
}

impl DispatchConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_grid_bounds(mut self, min: GridPosition, max: GridPosition) -> Self {
        self.grid.min_x = min.x;
        self.grid.min_y = min.y;
        self.grid.max_x = max.x;
        self.grid.max_y = max.y;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.grid.cell_size = cell_size;
        self
    }

    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.timing.tick_ms = tick_ms;
        self
    }

    pub fn with_assignment_interval_ms(mut self, interval_ms: u64) -> Self {
        self.timing.assignment_interval_ms = interval_ms;
        self
    }

    pub fn with_patrol_interval_ms(mut self, interval_ms: u64) -> Self {
        self.timing.patrol_interval_ms = interval_ms;
        self
    }

    pub fn with_solver(mut self, kind: SolverKind) -> Self {
        self.solver.kind = kind;
        self
    }

    pub fn with_max_pickup_distance(mut self, cells: u32) -> Self {
        self.solver.max_pickup_distance = cells;
        self
    }

    pub fn with_wait_penalty_factor(mut self, factor: f64) -> Self {
        self.solver.wait_penalty_factor = factor;
        self
    }

    pub fn with_initial_passengers(mut self, count: usize) -> Self {
        self.passengers.initial_count = count;
        self
    }

    pub fn with_min_waiting_passengers(mut self, count: usize) -> Self {
        self.passengers.min_waiting = count;
        self
    }

    pub fn with_min_trip_distance(mut self, cells: u32) -> Self {
        self.passengers.min_trip_distance = cells;
        self
    }

    pub fn with_vulnerable_probability(mut self, probability: f64) -> Self {
        self.passengers.vulnerable_probability = probability;
        self
    }

    pub fn with_respawn(mut self, enabled: bool, delay_ms: u64) -> Self {
        self.passengers.respawn_on_dropoff = enabled;
        self.passengers.respawn_delay_ms = delay_ms;
        self
    }

    pub fn with_max_search_radius_multiplier(mut self, cap: Option<f64>) -> Self {
        self.passengers.max_search_radius_multiplier = cap;
        self
    }

    pub fn with_party_sizes(mut self, min: u32, max: u32) -> Self {
        self.passengers.min_party_size = min;
        self.passengers.max_party_size = max;
        self
    }

    pub fn with_events(mut self, enabled: bool, capacity: usize) -> Self {
        self.events.enabled = enabled;
        self.events.capacity = capacity;
        self
    }

    pub fn with_fleet(mut self, starting_positions: Vec<GridPosition>) -> Self {
        self.fleet.starting_positions = starting_positions;
        self
    }

    pub fn with_random_taxis(mut self, count: usize) -> Self {
        self.fleet.random_taxis = count;
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.fleet.capacity = capacity;
        self
    }

    pub fn with_patrol(mut self, mode: PatrolMode) -> Self {
        self.fleet.patrol = mode;
        self
    }

    /// A quiet world: no automatic passengers and stationary idle taxis.
    pub fn without_background_activity(self) -> Self {
        self.with_initial_passengers(0)
            .with_min_waiting_passengers(0)
            .with_respawn(false, 0)
            .with_patrol(PatrolMode::Hold)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));

        if !self.grid.cell_size.is_finite() || self.grid.cell_size <= 0.0 {
            return invalid(format!(
                "grid.cell_size must be positive, got {}",
                self.grid.cell_size
            ));
        }
        if self.grid.min_x > self.grid.max_x || self.grid.min_y > self.grid.max_y {
            return invalid(format!(
                "grid bounds are inverted: min {} max {}",
                self.grid.min(),
                self.grid.max()
            ));
        }
        let span = u64::from(self.grid.min_x.abs_diff(self.grid.max_x))
            + u64::from(self.grid.min_y.abs_diff(self.grid.max_y));
        if span > MAX_GRID_SPAN {
            return invalid(format!(
                "grid spans {span} cells across both axes, at most {MAX_GRID_SPAN} are allowed"
            ));
        }
        for (name, value) in [
            ("timing.tick_ms", self.timing.tick_ms),
            ("timing.assignment_interval_ms", self.timing.assignment_interval_ms),
            ("timing.patrol_interval_ms", self.timing.patrol_interval_ms),
            (
                "passengers.radius_growth_interval_ms",
                self.passengers.radius_growth_interval_ms,
            ),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be greater than zero"));
            }
        }
        if !self.solver.wait_penalty_factor.is_finite() {
            return invalid("solver.wait_penalty_factor must be finite".to_string());
        }
        if !(0.0..=1.0).contains(&self.passengers.vulnerable_probability) {
            return invalid(format!(
                "passengers.vulnerable_probability must be within [0, 1], got {}",
                self.passengers.vulnerable_probability
            ));
        }
        if !self.passengers.radius_growth_step.is_finite() || self.passengers.radius_growth_step < 0.0
        {
            return invalid("passengers.radius_growth_step must be non-negative".to_string());
        }
        if let Some(cap) = self.passengers.max_search_radius_multiplier {
            if !cap.is_finite() || cap < 1.0 {
                return invalid(format!(
                    "passengers.max_search_radius_multiplier must be at least 1, got {cap}"
                ));
            }
        }
        if self.passengers.max_spawn_attempts == 0 {
            return invalid("passengers.max_spawn_attempts must be greater than zero".to_string());
        }
        if self.fleet.capacity == 0 {
            return invalid("fleet.capacity must be greater than zero".to_string());
        }
        let (min_party, max_party) = (self.passengers.min_party_size, self.passengers.max_party_size);
        if min_party == 0 || min_party > max_party {
            return invalid(format!(
                "passengers party size range {min_party}..={max_party} must be non-empty and start at 1 or more"
            ));
        }
        if max_party > self.fleet.capacity {
            return invalid(format!(
                "passengers.max_party_size {max_party} exceeds fleet.capacity {}",
                self.fleet.capacity
            ));
        }
        if self.events.enabled && self.events.capacity == 0 {
            return invalid("events.capacity must be greater than zero when events are enabled".to_string());
        }
        if let Some(outside) = self
            .fleet
            .starting_positions
            .iter()
            .find(|position| !self.grid.contains(**position))
        {
            return invalid(format!("fleet starting position {outside} is outside the grid"));
        }
        Ok(())
    }
}
