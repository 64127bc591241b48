//! Feasibility and cost rules shared by every assignment solver.

use std::collections::HashSet;

use super::types::{Assignment, CandidatePair, MatchConstraints, PassengerRequest, TaxiCandidate};

/// Pickup reach in cells for a passenger, grown by its search radius multiplier.
pub fn reach(passenger: &PassengerRequest, constraints: &MatchConstraints) -> f64 {
    f64::from(constraints.max_pickup_distance) * passenger.search_radius_multiplier
}

pub fn is_feasible(
    taxi: &TaxiCandidate,
    passenger: &PassengerRequest,
    constraints: &MatchConstraints,
) -> bool {
    taxi.can_carry(passenger.party_size)
        && f64::from(taxi.position.manhattan(passenger.pickup)) <= reach(passenger, constraints)
}

/// `distance + wait_penalty_factor * wait_secs`.
pub fn pair_cost(distance: u32, passenger: &PassengerRequest, constraints: &MatchConstraints) -> f64 {
    f64::from(distance)
        + constraints.wait_penalty_factor * (passenger.wait_time_ms as f64 / 1000.0)
}

/// Every feasible pair, in passenger-major order of the input slices.
pub fn feasible_pairs(
    taxis: &[TaxiCandidate],
    passengers: &[PassengerRequest],
    constraints: &MatchConstraints,
) -> Vec<CandidatePair> {
    let mut pairs = Vec::new();
    for (passenger_index, passenger) in passengers.iter().enumerate() {
        for (taxi_index, taxi) in taxis.iter().enumerate() {
            if !is_feasible(taxi, passenger, constraints) {
                continue;
            }
            let distance = taxi.position.manhattan(passenger.pickup);
            pairs.push(CandidatePair {
                taxi_index,
                passenger_index,
                distance,
                cost: pair_cost(distance, passenger, constraints),
            });
        }
    }
    pairs
}

/// Splits passengers into the vulnerable tier and the rest, each sorted by id.
pub fn priority_tiers(passengers: &[PassengerRequest]) -> [Vec<PassengerRequest>; 2] {
    let (mut vulnerable, mut regular): (Vec<_>, Vec<_>) =
        passengers.iter().copied().partition(|p| p.vulnerable);
    vulnerable.sort_by_key(|p| p.id);
    regular.sort_by_key(|p| p.id);
    [vulnerable, regular]
}

/// Checks one-to-one use and every hard constraint for a proposed matching.
pub fn is_valid_matching(
    taxis: &[TaxiCandidate],
    passengers: &[PassengerRequest],
    assignments: &[Assignment],
    constraints: &MatchConstraints,
) -> bool {
    let mut used_taxis = HashSet::new();
    let mut used_passengers = HashSet::new();
    assignments.iter().all(|assignment| {
        let taxi = taxis.iter().find(|t| t.id == assignment.taxi_id);
        let passenger = passengers.iter().find(|p| p.id == assignment.passenger_id);
        match (taxi, passenger) {
            (Some(taxi), Some(passenger)) => {
                used_taxis.insert(taxi.id)
                    && used_passengers.insert(passenger.id)
                    && is_feasible(taxi, passenger, constraints)
            }
            _ => false,
        }
    })
}
