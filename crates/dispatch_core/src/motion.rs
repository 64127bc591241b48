//! Per-taxi state machine: IDLE -> PICKUP -> DROPOFF -> IDLE.
//!
//! Transitions operate on component references so the ECS systems and the
//! simulation facade share one implementation.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::ecs::{Passenger, PassengerId, PassengerStatus, Patrol, Position, Route, Taxi, TaxiState};
use crate::error::DispatchError;
use crate::grid::{GridNetwork, GridPosition};

/// Result of advancing a taxi by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub moved: Option<(GridPosition, GridPosition)>,
    pub arrived: bool,
}

/// IDLE -> PICKUP. Leaves taxi and passenger untouched on error.
pub fn begin_pickup(
    taxi: &mut Taxi,
    position: &Position,
    route: &mut Route,
    passenger: &mut Passenger,
    grid: &GridNetwork,
    now: u64,
) -> Result<(), DispatchError> {
    if taxi.state != TaxiState::Idle {
        return Err(DispatchError::TaxiUnavailable(taxi.id));
    }
    if !passenger.is_waiting() {
        return Err(DispatchError::PassengerNotWaiting(passenger.id));
    }
    if taxi
        .current_load
        .checked_add(passenger.party_size)
        .map_or(true, |load| load > taxi.capacity)
    {
        return Err(DispatchError::CapacityExceeded {
            taxi: taxi.id,
            party_size: passenger.party_size,
            load: taxi.current_load,
            capacity: taxi.capacity,
        });
    }
    let path = grid.path(position.0, passenger.pickup)?;

    route.replace(path);
    taxi.state = TaxiState::Pickup;
    taxi.target = Some(passenger.pickup);
    taxi.assigned_passenger = Some(passenger.id);
    passenger.status = PassengerStatus::Assigned(taxi.id);
    passenger.matched_at = Some(now);
    debug!(taxi = %taxi.id, passenger = %passenger.id, from = %position.0, pickup = %passenger.pickup, "pickup started");
    Ok(())
}

/// Moves a busy taxi one node along its route.
///
/// Arrival is logical equality with the target. An empty route short of the
/// target is recomputed from the current position.
pub fn advance(
    taxi: &Taxi,
    position: &mut Position,
    route: &mut Route,
    grid: &GridNetwork,
) -> Result<StepOutcome, DispatchError> {
    let Some(target) = taxi.target else {
        return Ok(StepOutcome::default());
    };
    if taxi.state == TaxiState::Idle {
        return Ok(StepOutcome::default());
    }
    if position.0 == target {
        return Ok(StepOutcome {
            moved: None,
            arrived: true,
        });
    }

    let next = match route.peek() {
        Some(next) if position.0.is_adjacent(next) => route.next_node(),
        _ => {
            route.replace(grid.path(position.0, target)?);
            route.next_node()
        }
    };
    let Some(next) = next else {
        return Ok(StepOutcome::default());
    };

    let from = position.0;
    position.0 = next;
    Ok(StepOutcome {
        moved: Some((from, next)),
        arrived: next == target,
    })
}

/// PICKUP -> DROPOFF on arrival at the pickup.
pub fn complete_pickup(
    taxi: &mut Taxi,
    position: &Position,
    route: &mut Route,
    passenger: &mut Passenger,
    grid: &GridNetwork,
    now: u64,
) -> Result<(), DispatchError> {
    let load = taxi
        .current_load
        .checked_add(passenger.party_size)
        .filter(|load| *load <= taxi.capacity)
        .ok_or(DispatchError::CapacityExceeded {
            taxi: taxi.id,
            party_size: passenger.party_size,
            load: taxi.current_load,
            capacity: taxi.capacity,
        })?;
    let path = grid.path(position.0, passenger.dropoff)?;

    route.replace(path);
    taxi.current_load = load;
    taxi.state = TaxiState::Dropoff;
    taxi.target = Some(passenger.dropoff);
    passenger.status = PassengerStatus::Riding(taxi.id);
    passenger.picked_up_at = Some(now);
    debug!(taxi = %taxi.id, passenger = %passenger.id, dropoff = %passenger.dropoff, load, "passenger picked up");
    Ok(())
}

/// DROPOFF -> IDLE on arrival at the dropoff. Unloads `party_size` riders
/// and returns the passenger to remove.
///
/// # Panics
///
/// Panics when fewer than `party_size` riders are on board; that is a
/// corrupted state.
pub fn complete_dropoff(
    taxi: &mut Taxi,
    route: &mut Route,
    party_size: u32,
) -> Option<PassengerId> {
    let Some(load) = taxi.current_load.checked_sub(party_size) else {
        panic!(
            "{} reached its dropoff with {} on board for a party of {party_size}",
            taxi.id, taxi.current_load
        );
    };
    taxi.current_load = load;
    taxi.state = TaxiState::Idle;
    taxi.target = None;
    route.clear();
    let passenger = taxi.assigned_passenger.take();
    debug!(taxi = %taxi.id, load, "passenger dropped off");
    passenger
}

/// Returns a PICKUP taxi to IDLE when its passenger disappeared.
pub fn release(taxi: &mut Taxi, route: &mut Route) {
    taxi.state = TaxiState::Idle;
    taxi.target = None;
    taxi.assigned_passenger = None;
    route.clear();
}

/// One random cardinal step for an idle taxi, avoiding the cell it just
/// left whenever another neighbor exists.
pub fn patrol_step<R: Rng + ?Sized>(
    position: &mut Position,
    patrol: &mut Patrol,
    grid: &GridNetwork,
    rng: &mut R,
) -> Option<(GridPosition, GridPosition)> {
    let mut options = grid.neighbors(position.0);
    if options.len() > 1 {
        if let Some(previous) = patrol.previous {
            options.retain(|candidate| *candidate != previous);
        }
    }
    let next = *options.choose(rng)?;
    let from = position.0;
    patrol.previous = Some(from);
    position.0 = next;
    Some((from, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{PassengerId, TaxiId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid() -> GridNetwork {
        GridNetwork::new(20.0, GridPosition::new(-10, -10), GridPosition::new(10, 10))
            .expect("grid")
    }

    fn passenger(pickup: (i32, i32), dropoff: (i32, i32)) -> Passenger {
        Passenger::new(PassengerId(1), pickup.into(), dropoff.into(), None, 0)
    }

    #[test]
    fn full_cycle_through_all_states() {
        let grid = grid();
        let mut taxi = Taxi::new(TaxiId(0), 4);
        let mut position = Position(GridPosition::new(0, 0));
        let mut route = Route::default();
        let mut p = passenger((0, 2), (2, 2));

        begin_pickup(&mut taxi, &position, &mut route, &mut p, &grid, 0).expect("assign");
        assert_eq!(taxi.state, TaxiState::Pickup);
        assert_eq!(p.status, PassengerStatus::Assigned(TaxiId(0)));

        let first = advance(&taxi, &mut position, &mut route, &grid).expect("step");
        assert_eq!(first.moved, Some((GridPosition::new(0, 0), GridPosition::new(0, 1))));
        assert!(!first.arrived);
        let second = advance(&taxi, &mut position, &mut route, &grid).expect("step");
        assert!(second.arrived);

        complete_pickup(&mut taxi, &position, &mut route, &mut p, &grid, 2_000).expect("pickup");
        assert_eq!(taxi.state, TaxiState::Dropoff);
        assert_eq!(taxi.current_load, 1);
        assert_eq!(taxi.target, Some(GridPosition::new(2, 2)));
        assert_eq!(route.remaining(), 2);

        advance(&taxi, &mut position, &mut route, &grid).expect("step");
        let last = advance(&taxi, &mut position, &mut route, &grid).expect("step");
        assert!(last.arrived);

        assert_eq!(complete_dropoff(&mut taxi, &mut route, 1), Some(PassengerId(1)));
        assert_eq!(taxi.state, TaxiState::Idle);
        assert_eq!(taxi.current_load, 0);
        assert_eq!(taxi.target, None);
        assert_eq!(taxi.assigned_passenger, None);
    }

    #[test]
    fn begin_pickup_rejects_full_taxi_without_mutation() {
        let grid = grid();
        let mut taxi = Taxi::new(TaxiId(0), 1);
        taxi.current_load = 1;
        let before = taxi.clone();
        let mut route = Route::default();
        let mut p = passenger((1, 0), (5, 0));

        let err = begin_pickup(&mut taxi, &Position(GridPosition::new(0, 0)), &mut route, &mut p, &grid, 0)
            .expect_err("full taxi");
        assert!(matches!(err, DispatchError::CapacityExceeded { load: 1, capacity: 1, .. }));
        assert_eq!(taxi, before);
        assert!(p.is_waiting());
        assert!(route.is_empty());
    }

    #[test]
    fn taxi_already_at_pickup_arrives_without_moving() {
        let grid = grid();
        let mut taxi = Taxi::new(TaxiId(0), 4);
        let mut position = Position(GridPosition::new(3, 3));
        let mut route = Route::default();
        let mut p = passenger((3, 3), (6, 3));

        begin_pickup(&mut taxi, &position, &mut route, &mut p, &grid, 0).expect("assign");
        let outcome = advance(&taxi, &mut position, &mut route, &grid).expect("step");
        assert_eq!(outcome, StepOutcome { moved: None, arrived: true });
    }

    #[test]
    fn stale_route_is_recomputed() {
        let grid = grid();
        let mut taxi = Taxi::new(TaxiId(0), 4);
        taxi.state = TaxiState::Pickup;
        taxi.target = Some(GridPosition::new(0, 3));
        let mut position = Position(GridPosition::new(0, 0));
        let mut route = Route::default();
        route.replace(vec![GridPosition::new(5, 5), GridPosition::new(5, 6)]);

        let outcome = advance(&taxi, &mut position, &mut route, &grid).expect("step");
        assert_eq!(outcome.moved, Some((GridPosition::new(0, 0), GridPosition::new(0, 1))));
        assert_eq!(route.remaining(), 2);
    }

    #[test]
    #[should_panic(expected = "0 on board for a party of 1")]
    fn dropoff_with_empty_taxi_panics() {
        let mut taxi = Taxi::new(TaxiId(0), 4);
        taxi.state = TaxiState::Dropoff;
        complete_dropoff(&mut taxi, &mut Route::default(), 1);
    }

    #[test]
    fn begin_pickup_refuses_party_larger_than_free_seats() {
        let grid = grid();
        let mut taxi = Taxi::new(TaxiId(0), 4);
        taxi.current_load = 2;
        let before = taxi.clone();
        let mut route = Route::default();
        let mut p = passenger((1, 0), (5, 0)).with_party_size(3);

        let err = begin_pickup(&mut taxi, &Position(GridPosition::new(0, 0)), &mut route, &mut p, &grid, 0)
            .expect_err("party of three needs three seats");
        assert!(matches!(err, DispatchError::CapacityExceeded { load: 2, capacity: 4, .. }));
        assert_eq!(taxi, before);
        assert!(p.is_waiting());
    }

    #[test]
    fn whole_party_boards_and_alights_together() {
        let grid = grid();
        let mut taxi = Taxi::new(TaxiId(0), 4);
        let mut position = Position(GridPosition::new(0, 0));
        let mut route = Route::default();
        let mut p = passenger((0, 0), (3, 0)).with_party_size(3);

        begin_pickup(&mut taxi, &position, &mut route, &mut p, &grid, 0).expect("assign");
        assert!(advance(&taxi, &mut position, &mut route, &grid).expect("step").arrived);
        complete_pickup(&mut taxi, &position, &mut route, &mut p, &grid, 0).expect("pickup");
        assert_eq!(taxi.current_load, 3);

        assert_eq!(complete_dropoff(&mut taxi, &mut route, p.party_size), Some(PassengerId(1)));
        assert_eq!(taxi.current_load, 0);
    }

    #[test]
    fn patrol_never_reverses_when_it_has_a_choice() {
        let grid = grid();
        let mut rng = StdRng::seed_from_u64(9);
        let mut position = Position(GridPosition::new(0, 0));
        let mut patrol = Patrol::default();
        for _ in 0..200 {
            let before = patrol.previous;
            let (from, to) = patrol_step(&mut position, &mut patrol, &grid, &mut rng).expect("step");
            assert!(from.is_adjacent(to));
            assert!(grid.contains(to));
            assert_ne!(Some(to), before);
        }
    }

    #[test]
    fn patrol_on_single_cell_grid_stays_put() {
        let grid = GridNetwork::new(20.0, GridPosition::new(0, 0), GridPosition::new(0, 0)).expect("grid");
        let mut rng = StdRng::seed_from_u64(1);
        let mut position = Position(GridPosition::new(0, 0));
        assert!(patrol_step(&mut position, &mut Patrol::default(), &grid, &mut rng).is_none());
    }
}
