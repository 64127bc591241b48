//! Passenger spawning: trip sampling with a minimum Manhattan length,
//! vulnerability draws and party sizes.
//!
//! Pure functions over a [GridNetwork] and an RNG; the systems in
//! `systems::spawner` and the simulation facade wrap them into entities.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PassengerConfig;
use crate::ecs::VulnerableCategory;
use crate::error::DispatchError;
use crate::grid::{GridNetwork, GridPosition};

/// Rejects trips whose endpoints are closer than `min_distance` cells.
pub fn validate_trip(
    pickup: GridPosition,
    dropoff: GridPosition,
    min_distance: u32,
) -> Result<(), DispatchError> {
    if pickup == dropoff || pickup.manhattan(dropoff) < min_distance {
        return Err(DispatchError::TripTooShort {
            pickup,
            dropoff,
            min_distance,
        });
    }
    Ok(())
}

/// Samples pickup and dropoff independently until they are far enough apart.
pub fn sample_trip<R: Rng + ?Sized>(
    grid: &GridNetwork,
    rng: &mut R,
    min_distance: u32,
    max_attempts: u32,
) -> Result<(GridPosition, GridPosition), DispatchError> {
    for _ in 0..max_attempts {
        let pickup = grid.random_valid_position(rng);
        let dropoff = grid.random_valid_position(rng);
        if validate_trip(pickup, dropoff, min_distance).is_ok() {
            return Ok((pickup, dropoff));
        }
    }
    Err(DispatchError::SpawnExhausted {
        attempts: max_attempts,
        min_distance,
    })
}

/// Samples a dropoff for a fixed pickup.
pub fn sample_dropoff<R: Rng + ?Sized>(
    grid: &GridNetwork,
    rng: &mut R,
    pickup: GridPosition,
    min_distance: u32,
    max_attempts: u32,
) -> Result<GridPosition, DispatchError> {
    for _ in 0..max_attempts {
        let dropoff = grid.random_valid_position(rng);
        if validate_trip(pickup, dropoff, min_distance).is_ok() {
            return Ok(dropoff);
        }
    }
    Err(DispatchError::SpawnExhausted {
        attempts: max_attempts,
        min_distance,
    })
}

pub fn sample_vulnerability<R: Rng + ?Sized>(
    rng: &mut R,
    probability: f64,
) -> Option<VulnerableCategory> {
    if probability <= 0.0 || !rng.gen_bool(probability.min(1.0)) {
        return None;
    }
    VulnerableCategory::ALL.choose(rng).copied()
}

/// Uniform party size in `min..=max`; a collapsed or inverted range yields `min`.
pub fn sample_party_size<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// A freshly sampled passenger trip, not yet in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripRequest {
    pub pickup: GridPosition,
    pub dropoff: GridPosition,
    pub vulnerable: Option<VulnerableCategory>,
    pub party_size: u32,
}

impl TripRequest {
    /// A single rider without a vulnerability.
    pub fn new(pickup: GridPosition, dropoff: GridPosition) -> Self {
        Self {
            pickup,
            dropoff,
            vulnerable: None,
            party_size: 1,
        }
    }
}

pub fn sample_request<R: Rng + ?Sized>(
    grid: &GridNetwork,
    rng: &mut R,
    config: &PassengerConfig,
) -> Result<TripRequest, DispatchError> {
    let (pickup, dropoff) =
        sample_trip(grid, rng, config.min_trip_distance, config.max_spawn_attempts)?;
    Ok(TripRequest {
        pickup,
        dropoff,
        vulnerable: sample_vulnerability(rng, config.vulnerable_probability),
        party_size: sample_party_size(rng, config.min_party_size, config.max_party_size),
    })
}
