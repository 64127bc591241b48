use crate::error::SolverError;

use super::policy::priority_tiers;
use super::types::{Assignment, MatchConstraints, PassengerRequest, TaxiCandidate};

/// Trait for solvers that pair idle taxis with waiting passengers.
pub trait AssignmentSolver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Match a single priority tier.
    ///
    /// Implementations must return a one-to-one matching in which every pair
    /// is feasible, maximizing the number of pairs and then minimizing total
    /// cost. Equal-cost alternatives are resolved deterministically from ids,
    /// independent of the order of the input slices.
    fn match_tier(
        &self,
        taxis: &[TaxiCandidate],
        passengers: &[PassengerRequest],
        constraints: &MatchConstraints,
    ) -> Result<Vec<Assignment>, SolverError>;

    /// Vulnerable passengers are matched first; the rest only see the taxis
    /// left over. Output is sorted by passenger id.
    fn solve(
        &self,
        taxis: &[TaxiCandidate],
        passengers: &[PassengerRequest],
        constraints: &MatchConstraints,
    ) -> Result<Vec<Assignment>, SolverError> {
        let mut remaining: Vec<TaxiCandidate> = taxis.to_vec();
        remaining.sort_by_key(|taxi| taxi.id);

        let mut assignments = Vec::new();
        for tier in priority_tiers(passengers) {
            if tier.is_empty() || remaining.is_empty() {
                continue;
            }
            let matched = self.match_tier(&remaining, &tier, constraints)?;
            remaining.retain(|taxi| !matched.iter().any(|a| a.taxi_id == taxi.id));
            assignments.extend(matched);
        }
        assignments.sort_by_key(|a| (a.passenger_id, a.taxi_id));
        Ok(assignments)
    }
}
