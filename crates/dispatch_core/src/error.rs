use thiserror::Error;

use crate::ecs::{PassengerId, TaxiId};
use crate::grid::GridPosition;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("position {0} lies outside the lattice bounds")]
    OutOfBounds(GridPosition),

    #[error("invalid lattice bounds: min {min} exceeds max {max}")]
    InvalidBounds { min: GridPosition, max: GridPosition },

    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),

    #[error("lattice spans {span} cells across both axes, limit is {limit}")]
    TooLarge { span: u64, limit: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("assignment problem has {pairs} candidate pairs, exact solver limit is {limit}")]
    ProblemTooLarge { pairs: usize, limit: usize },

    #[error("integer weight encoding overflowed for a {rows}x{columns} matrix")]
    WeightOverflow { rows: usize, columns: usize },
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("taxi {0} not found")]
    TaxiNotFound(TaxiId),

    #[error("passenger {0} not found")]
    PassengerNotFound(PassengerId),

    #[error("taxi {0} is not idle")]
    TaxiUnavailable(TaxiId),

    #[error("passenger {0} is not waiting")]
    PassengerNotWaiting(PassengerId),

    #[error("taxi {taxi} cannot seat a party of {party_size}: load {load} of capacity {capacity}")]
    CapacityExceeded {
        taxi: TaxiId,
        party_size: u32,
        load: u32,
        capacity: u32,
    },

    #[error("party of {party_size} does not fit a fleet capacity of {capacity}")]
    InvalidPartySize { party_size: u32, capacity: u32 },

    #[error("taxi {taxi} is {distance} cells from passenger {passenger}, reach is {reach:.1}")]
    OutOfReach {
        taxi: TaxiId,
        passenger: PassengerId,
        distance: u32,
        reach: f64,
    },

    #[error("trip {pickup} -> {dropoff} is shorter than the minimum of {min_distance} cells")]
    TripTooShort {
        pickup: GridPosition,
        dropoff: GridPosition,
        min_distance: u32,
    },

    #[error("no trip of at least {min_distance} cells found after {attempts} attempts")]
    SpawnExhausted { attempts: u32, min_distance: u32 },

    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
