//! Hungarian (Kuhn-Munkres) matching over an integer weight matrix.
//!
//! Costs are encoded so that a single maximum-weight assignment yields, in
//! order of precedence: the most feasible pairs, then the lowest total cost.
//!
//! A small rank term (`passenger_index * taxis + taxi_index`) nudges the
//! solver toward lower ids when it must choose *which* taxis or passengers
//! stay unmatched. It cannot order two matchings over the same sets of taxis
//! and passengers: their rank sums are equal. Those ties fall to
//! `kuhn_munkres` itself, which is deterministic for the id-sorted input, so
//! the result depends on ids and positions, never on input order.

use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use crate::error::SolverError;

use super::algorithm::AssignmentSolver;
use super::policy::feasible_pairs;
use super::types::{Assignment, MatchConstraints, PassengerRequest, TaxiCandidate};

/// Fixed-point scale for costs (thousandths of a cell).
const COST_SCALE: f64 = 1_000.0;

/// Largest scaled cost representable exactly in an f64.
const MAX_SCALED_COST: f64 = 9.0e15;

/// Infeasible cells carry zero weight and are dropped from the result.
const INFEASIBLE: i64 = 0;

/// Row-major i64 matrix implementing pathfinding's Weights.
struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HungarianSolver {
    max_pairs: usize,
}

impl HungarianSolver {
    pub fn new(max_pairs: usize) -> Self {
        Self { max_pairs }
    }

    pub fn max_pairs(&self) -> usize {
        self.max_pairs
    }
}

impl Default for HungarianSolver {
    fn default() -> Self {
        Self::new(crate::config::SolverConfig::default().max_exact_pairs)
    }
}

impl AssignmentSolver for HungarianSolver {
    fn name(&self) -> &'static str {
        "hungarian"
    }

    fn match_tier(
        &self,
        taxis: &[TaxiCandidate],
        passengers: &[PassengerRequest],
        constraints: &MatchConstraints,
    ) -> Result<Vec<Assignment>, SolverError> {
        if taxis.is_empty() || passengers.is_empty() {
            return Ok(Vec::new());
        }
        let pair_count = taxis.len().saturating_mul(passengers.len());
        if pair_count > self.max_pairs {
            return Err(SolverError::ProblemTooLarge {
                pairs: pair_count,
                limit: self.max_pairs,
            });
        }

        // Sorted by id so the result is independent of input order.
        let mut taxis = taxis.to_vec();
        taxis.sort_by_key(|t| t.id);
        let mut passengers = passengers.to_vec();
        passengers.sort_by_key(|p| p.id);

        let candidates = feasible_pairs(&taxis, &passengers, constraints);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let overflow = || SolverError::WeightOverflow {
            rows: passengers.len(),
            columns: taxis.len(),
        };
        let passenger_count = i64::try_from(passengers.len()).map_err(|_| overflow())?;
        let taxi_count = i64::try_from(taxis.len()).map_err(|_| overflow())?;
        let matched_max = passenger_count.min(taxi_count);

        // Any sum of rank terms over one matching stays below tie_scale.
        let tie_scale = passenger_count
            .checked_mul(taxi_count)
            .and_then(|span| span.checked_mul(matched_max))
            .ok_or_else(overflow)?;

        let min_cost = candidates
            .iter()
            .map(|c| c.cost)
            .fold(f64::INFINITY, f64::min);
        let mut encoded = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            let scaled = ((candidate.cost - min_cost) * COST_SCALE).round();
            if !(0.0..MAX_SCALED_COST).contains(&scaled) {
                return Err(overflow());
            }
            let rank = candidate.passenger_index as i64 * taxi_count + candidate.taxi_index as i64;
            let value = (scaled as i64)
                .checked_mul(tie_scale)
                .and_then(|v| v.checked_add(rank))
                .ok_or_else(overflow)?;
            encoded.push(value);
        }

        // A base large enough that one more pair always outweighs any cost saving.
        let max_encoded = encoded.iter().copied().max().unwrap_or(0);
        let base = max_encoded
            .checked_add(1)
            .and_then(|v| v.checked_mul(matched_max + 1))
            .ok_or_else(overflow)?;
        // Headroom for the summed weights and label arithmetic inside kuhn_munkres.
        base.checked_mul(matched_max + 2).ok_or_else(overflow)?;

        // Kuhn-Munkres requires rows <= columns, so the smaller side becomes rows.
        let passengers_are_rows = passengers.len() <= taxis.len();
        let (rows, columns) = if passengers_are_rows {
            (passengers.len(), taxis.len())
        } else {
            (taxis.len(), passengers.len())
        };
        let mut matrix = vec![vec![INFEASIBLE; columns]; rows];
        for (candidate, value) in candidates.iter().zip(&encoded) {
            let (row, col) = if passengers_are_rows {
                (candidate.passenger_index, candidate.taxi_index)
            } else {
                (candidate.taxi_index, candidate.passenger_index)
            };
            matrix[row][col] = base - value;
        }

        let weights = I64Weights(matrix);
        let (_total, assignment) = kuhn_munkres(&weights);

        let mut results: Vec<Assignment> = assignment
            .iter()
            .enumerate()
            .filter(|&(row, &col)| weights.at(row, col) > INFEASIBLE)
            .map(|(row, &col)| {
                let (passenger_index, taxi_index) = if passengers_are_rows {
                    (row, col)
                } else {
                    (col, row)
                };
                Assignment {
                    taxi_id: taxis[taxi_index].id,
                    passenger_id: passengers[passenger_index].id,
                }
            })
            .collect();
        results.sort_by_key(|a| (a.passenger_id, a.taxi_id));
        Ok(results)
    }
}
