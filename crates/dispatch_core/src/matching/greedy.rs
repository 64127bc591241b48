//! Greedy matching: repeatedly take the cheapest feasible pair.
//!
//! O(P·T·log(P·T)) and never fails, which makes it the fallback for the
//! exact solver. It does not guarantee the maximum number of pairs.

use std::collections::HashSet;

use crate::error::SolverError;

use super::algorithm::AssignmentSolver;
use super::policy::feasible_pairs;
use super::types::{Assignment, MatchConstraints, PassengerRequest, TaxiCandidate};

#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySolver;

impl GreedySolver {
    pub fn match_greedy(
        &self,
        taxis: &[TaxiCandidate],
        passengers: &[PassengerRequest],
        constraints: &MatchConstraints,
    ) -> Vec<Assignment> {
        let mut pairs = feasible_pairs(taxis, passengers, constraints);
        pairs.sort_by(|a, b| {
            a.cost
                .total_cmp(&b.cost)
                .then_with(|| passengers[a.passenger_index].id.cmp(&passengers[b.passenger_index].id))
                .then_with(|| taxis[a.taxi_index].id.cmp(&taxis[b.taxi_index].id))
        });

        let mut used_taxis = HashSet::new();
        let mut used_passengers = HashSet::new();
        let mut assignments = Vec::new();
        for pair in pairs {
            if used_taxis.contains(&pair.taxi_index) || used_passengers.contains(&pair.passenger_index) {
                continue;
            }
            used_taxis.insert(pair.taxi_index);
            used_passengers.insert(pair.passenger_index);
            assignments.push(Assignment {
                taxi_id: taxis[pair.taxi_index].id,
                passenger_id: passengers[pair.passenger_index].id,
            });
        }
        assignments
    }
}

impl AssignmentSolver for GreedySolver {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn match_tier(
        &self,
        taxis: &[TaxiCandidate],
        passengers: &[PassengerRequest],
        constraints: &MatchConstraints,
    ) -> Result<Vec<Assignment>, SolverError> {
        Ok(self.match_greedy(taxis, passengers, constraints))
    }
}
