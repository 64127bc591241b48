//! Dispatch loop: every assignment interval, snapshot idle taxis and waiting
//! passengers, solve, and start the pickup for each accepted pair.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::{debug, error};

use crate::clock::{EventKind, SimulationClock};
use crate::config::{SolverConfig, TimingConfig};
use crate::ecs::{Passenger, Position, Route, Taxi};
use crate::error::DispatchError;
use crate::events::{DispatchEvent, OutboundEvents};
use crate::grid::GridNetwork;
use crate::matching::policy::reach;
use crate::matching::{Assignment, MatchConstraints, PassengerRequest, SolverResource, TaxiCandidate};
use crate::motion::begin_pickup;
use crate::telemetry::DispatchTelemetry;

/// Solver input for the current world state, both sides sorted by id.
pub fn collect_candidates<'a>(
    taxis: impl Iterator<Item = (&'a Taxi, &'a Position)>,
    passengers: impl Iterator<Item = &'a Passenger>,
) -> (Vec<TaxiCandidate>, Vec<PassengerRequest>) {
    let mut candidates: Vec<TaxiCandidate> = taxis
        .filter(|(taxi, _)| taxi.is_idle())
        .map(|(taxi, position)| TaxiCandidate::from_taxi(taxi, position))
        .collect();
    candidates.sort_by_key(|t| t.id);
    let mut requests: Vec<PassengerRequest> = passengers
        .filter(|p| p.is_waiting())
        .map(PassengerRequest::from_passenger)
        .collect();
    requests.sort_by_key(|p| p.id);
    (candidates, requests)
}

/// Applies one assignment, re-checking availability and capacity.
///
/// With `reach_check` set the pickup distance is validated too; externally
/// originated confirmations go through that path. Failures leave both
/// entities untouched and are logged and counted.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_assignment(
    assignment: Assignment,
    taxis: &mut Query<(&mut Taxi, &Position, &mut Route)>,
    passengers: &mut Query<&mut Passenger>,
    grid: &GridNetwork,
    reach_check: Option<&MatchConstraints>,
    now: u64,
    telemetry: &mut DispatchTelemetry,
    outbound: &mut OutboundEvents,
) -> Result<(), DispatchError> {
    let result = apply(assignment, taxis, passengers, grid, reach_check, now);
    match &result {
        Ok(()) => {
            telemetry.assignments_applied += 1;
            outbound.push(
                now,
                DispatchEvent::PassengerAssigned {
                    passenger: assignment.passenger_id,
                    taxi: assignment.taxi_id,
                },
            );
        }
        Err(err) => {
            telemetry.assignments_aborted += 1;
            error!(
                taxi = %assignment.taxi_id,
                passenger = %assignment.passenger_id,
                error = %err,
                "assignment aborted"
            );
        }
    }
    result
}

fn apply(
    assignment: Assignment,
    taxis: &mut Query<(&mut Taxi, &Position, &mut Route)>,
    passengers: &mut Query<&mut Passenger>,
    grid: &GridNetwork,
    reach_check: Option<&MatchConstraints>,
    now: u64,
) -> Result<(), DispatchError> {
    let (mut taxi, position, mut route) = taxis
        .iter_mut()
        .find(|(taxi, _, _)| taxi.id == assignment.taxi_id)
        .ok_or(DispatchError::TaxiNotFound(assignment.taxi_id))?;
    let mut passenger = passengers
        .iter_mut()
        .find(|p| p.id == assignment.passenger_id)
        .ok_or(DispatchError::PassengerNotFound(assignment.passenger_id))?;

    if let Some(constraints) = reach_check {
        let request = PassengerRequest::from_passenger(&passenger);
        let distance = position.0.manhattan(passenger.pickup);
        let reach = reach(&request, constraints);
        if f64::from(distance) > reach {
            return Err(DispatchError::OutOfReach {
                taxi: taxi.id,
                passenger: passenger.id,
                distance,
                reach,
            });
        }
    }
    begin_pickup(&mut taxi, position, &mut route, &mut passenger, grid, now)
}

#[allow(clippy::too_many_arguments)]
pub fn assignment_system(
    mut clock: ResMut<SimulationClock>,
    timing: Res<TimingConfig>,
    solver_config: Res<SolverConfig>,
    solver: Res<SolverResource>,
    grid: Res<GridNetwork>,
    mut telemetry: ResMut<DispatchTelemetry>,
    mut outbound: ResMut<OutboundEvents>,
    mut taxis: Query<(&mut Taxi, &Position, &mut Route)>,
    mut passengers: Query<&mut Passenger>,
) {
    let now = clock.now();
    clock.schedule_in(timing.assignment_interval_ms, EventKind::AssignmentTick);

    let (candidates, requests) = collect_candidates(
        taxis.iter().map(|(taxi, position, _)| (taxi, position)),
        passengers.iter(),
    );
    if candidates.is_empty() || requests.is_empty() {
        return;
    }

    let constraints = MatchConstraints::from(&*solver_config);
    let report = solver.solve(&candidates, &requests, &constraints);
    telemetry.solver_runs += 1;
    if report.used_fallback() {
        telemetry.fallback_runs += 1;
    }
    debug!(
        taxis = candidates.len(),
        passengers = requests.len(),
        matched = report.assignments.len(),
        fallback = report.used_fallback(),
        "assignment cycle"
    );

    for assignment in report.assignments {
        // Failures are logged and counted inside; the passenger keeps waiting.
        let _ = dispatch_assignment(
            assignment,
            &mut taxis,
            &mut passengers,
            &grid,
            None,
            now,
            &mut telemetry,
            &mut outbound,
        );
    }
}
