use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::ecs::{Passenger, PassengerId, Position, Taxi, TaxiId};
use crate::grid::GridPosition;

/// Snapshot of an idle taxi as the solver sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxiCandidate {
    pub id: TaxiId,
    pub position: GridPosition,
    pub current_load: u32,
    pub capacity: u32,
}

impl TaxiCandidate {
    pub fn from_taxi(taxi: &Taxi, position: &Position) -> Self {
        Self {
            id: taxi.id,
            position: position.0,
            current_load: taxi.current_load,
            capacity: taxi.capacity,
        }
    }

    /// Whether `party_size` more riders fit on top of the current load.
    pub fn can_carry(&self, party_size: u32) -> bool {
        self.current_load
            .checked_add(party_size)
            .is_some_and(|load| load <= self.capacity)
    }
}

/// Snapshot of a waiting passenger as the solver sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassengerRequest {
    pub id: PassengerId,
    pub pickup: GridPosition,
    pub wait_time_ms: u64,
    pub vulnerable: bool,
    pub search_radius_multiplier: f64,
    /// Seats the passenger's party needs.
    pub party_size: u32,
}

impl PassengerRequest {
    pub fn from_passenger(passenger: &Passenger) -> Self {
        Self {
            id: passenger.id,
            pickup: passenger.pickup,
            wait_time_ms: passenger.wait_time_ms,
            vulnerable: passenger.is_vulnerable(),
            search_radius_multiplier: passenger.search_radius_multiplier,
            party_size: passenger.party_size,
        }
    }
}

/// A proposed pairing, applied immediately or discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub taxi_id: TaxiId,
    pub passenger_id: PassengerId,
}

/// Hard limits and cost weights shared by every solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConstraints {
    pub max_pickup_distance: u32,
    pub wait_penalty_factor: f64,
}

impl Default for MatchConstraints {
    fn default() -> Self {
        Self::from(&SolverConfig::default())
    }
}

impl From<&SolverConfig> for MatchConstraints {
    fn from(config: &SolverConfig) -> Self {
        Self {
            max_pickup_distance: config.max_pickup_distance,
            wait_penalty_factor: config.wait_penalty_factor,
        }
    }
}

/// A feasible taxi/passenger pair with its pickup distance and cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    pub taxi_index: usize,
    pub passenger_index: usize,
    pub distance: u32,
    pub cost: f64,
}
