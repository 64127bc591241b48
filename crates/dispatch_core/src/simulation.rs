//! Single-owner handle on a running dispatch world.
//!
//! [DispatchSimulation] owns the bevy [World] and [Schedule]. Hosts step it
//! synchronously, read snapshots, inject passengers and drain outbound events.

use bevy_ecs::prelude::{Query, Res, ResMut, Schedule, World};
use bevy_ecs::system::SystemState;
use tracing::info;

use crate::clock::SimulationClock;
use crate::config::{DispatchConfig, PassengerConfig, SolverConfig};
use crate::ecs::{
    DispatchRng, Passenger, PassengerId, Position, Route, Taxi, VulnerableCategory,
};
use crate::error::DispatchError;
use crate::events::{OutboundEvents, TimedEvent};
use crate::grid::{GridNetwork, GridPosition};
use crate::matching::{Assignment, MatchConstraints, SolveReport, SolverResource};
use crate::runner::{dispatch_schedule, initialize_simulation, run_next_event, run_until};
use crate::scenario::{build_scenario, spawn_request};
use crate::spawner::{
    sample_dropoff, sample_party_size, sample_vulnerability, validate_trip, TripRequest,
};
use crate::systems::assignment::{collect_candidates, dispatch_assignment};
use crate::telemetry::{capture_snapshot, DispatchTelemetry, SimulationSnapshot};

type AssignmentParams = (
    Query<'static, 'static, (&'static mut Taxi, &'static Position, &'static mut Route)>,
    Query<'static, 'static, &'static mut Passenger>,
    Res<'static, GridNetwork>,
    Res<'static, SolverConfig>,
    Res<'static, SimulationClock>,
    ResMut<'static, DispatchTelemetry>,
    ResMut<'static, OutboundEvents>,
);

pub struct DispatchSimulation {
    config: DispatchConfig,
    world: World,
    schedule: Schedule,
}

impl DispatchSimulation {
    pub fn new(config: DispatchConfig) -> Result<Self, DispatchError> {
        let (world, schedule) = Self::build(&config)?;
        Ok(Self {
            config,
            world,
            schedule,
        })
    }

    fn build(config: &DispatchConfig) -> Result<(World, Schedule), DispatchError> {
        let mut world = World::new();
        build_scenario(&mut world, config)?;
        initialize_simulation(&mut world);
        Ok((world, dispatch_schedule()))
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn now(&self) -> u64 {
        self.world.resource::<SimulationClock>().now()
    }

    pub fn grid(&self) -> &GridNetwork {
        self.world.resource::<GridNetwork>()
    }

    /// Processes the next pending event. Returns `false` when nothing is scheduled.
    pub fn step(&mut self) -> bool {
        run_next_event(&mut self.world, &mut self.schedule)
    }

    /// Processes every event up to and including `end_ms`.
    pub fn run_until(&mut self, end_ms: u64) -> usize {
        run_until(&mut self.world, &mut self.schedule, end_ms)
    }

    pub fn run_for(&mut self, duration_ms: u64) -> usize {
        let end_ms = self.now().saturating_add(duration_ms);
        self.run_until(end_ms)
    }

    pub fn snapshot(&mut self) -> SimulationSnapshot {
        capture_snapshot(&mut self.world)
    }

    /// Adds a passenger at the intersection nearest a world coordinate, with
    /// a random dropoff at least the minimum trip distance away.
    pub fn add_passenger(&mut self, world_x: f64, world_y: f64) -> Result<PassengerId, DispatchError> {
        let grid = self.grid().clone();
        let config = self.world.resource::<PassengerConfig>().clone();
        let pickup = grid.snap(world_x, world_y);
        let request = {
            let rng = &mut self.world.resource_mut::<DispatchRng>().0;
            let dropoff = sample_dropoff(
                &grid,
                rng,
                pickup,
                config.min_trip_distance,
                config.max_spawn_attempts,
            )?;
            TripRequest {
                pickup,
                dropoff,
                vulnerable: sample_vulnerability(rng, config.vulnerable_probability),
                party_size: sample_party_size(rng, config.min_party_size, config.max_party_size),
            }
        };
        let id = spawn_request(&mut self.world, &request);
        info!(passenger = %id, %pickup, dropoff = %request.dropoff, party = request.party_size, "passenger added on request");
        Ok(id)
    }

    /// Adds a passenger with explicit lattice endpoints, clamped into bounds.
    pub fn add_trip(
        &mut self,
        pickup: GridPosition,
        dropoff: GridPosition,
        vulnerable: Option<VulnerableCategory>,
    ) -> Result<PassengerId, DispatchError> {
        self.add_party_trip(pickup, dropoff, vulnerable, 1)
    }

    /// Same as [DispatchSimulation::add_trip] for a party of `party_size`
    /// riders, which must fit in an empty taxi.
    pub fn add_party_trip(
        &mut self,
        pickup: GridPosition,
        dropoff: GridPosition,
        vulnerable: Option<VulnerableCategory>,
        party_size: u32,
    ) -> Result<PassengerId, DispatchError> {
        let capacity = self.config.fleet.capacity;
        if party_size == 0 || party_size > capacity {
            return Err(DispatchError::InvalidPartySize {
                party_size,
                capacity,
            });
        }
        let grid = self.grid();
        let (pickup, dropoff) = (grid.clamp(pickup), grid.clamp(dropoff));
        let min_distance = self.world.resource::<PassengerConfig>().min_trip_distance;
        validate_trip(pickup, dropoff, min_distance)?;
        let request = TripRequest {
            vulnerable,
            party_size,
            ..TripRequest::new(pickup, dropoff)
        };
        Ok(spawn_request(&mut self.world, &request))
    }

    /// Applies an externally originated assignment under the same hard
    /// constraints the solver uses.
    pub fn apply_assignment(&mut self, assignment: Assignment) -> Result<(), DispatchError> {
        let mut state: SystemState<AssignmentParams> = SystemState::new(&mut self.world);
        let (mut taxis, mut passengers, grid, solver_config, clock, mut telemetry, mut outbound) =
            state.get_mut(&mut self.world);
        let constraints = MatchConstraints::from(&*solver_config);
        dispatch_assignment(
            assignment,
            &mut taxis,
            &mut passengers,
            &grid,
            Some(&constraints),
            clock.now(),
            &mut telemetry,
            &mut outbound,
        )
    }

    /// Runs the solver over the current state without applying anything.
    pub fn preview_assignments(&mut self) -> SolveReport {
        let constraints = MatchConstraints::from(self.world.resource::<SolverConfig>());
        let mut taxis = self.world.query::<(&Taxi, &Position)>();
        let mut passengers = self.world.query::<&Passenger>();
        let (candidates, requests) =
            collect_candidates(taxis.iter(&self.world), passengers.iter(&self.world));
        self.world
            .resource::<SolverResource>()
            .solve(&candidates, &requests, &constraints)
    }

    /// Clears everything and rebuilds the starting configuration.
    pub fn reset(&mut self) -> Result<(), DispatchError> {
        let (world, schedule) = Self::build(&self.config)?;
        self.world = world;
        self.schedule = schedule;
        info!("simulation reset");
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<TimedEvent> {
        self.world.resource_mut::<OutboundEvents>().drain()
    }

    pub fn telemetry(&self) -> &DispatchTelemetry {
        self.world.resource::<DispatchTelemetry>()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
