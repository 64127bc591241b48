pub mod algorithm;
pub mod greedy;
pub mod hungarian;
pub mod policy;
pub mod types;

use bevy_ecs::prelude::Resource;
use tracing::warn;

use crate::config::{SolverConfig, SolverKind};
use crate::error::SolverError;

pub use algorithm::AssignmentSolver;
pub use greedy::GreedySolver;
pub use hungarian::HungarianSolver;
pub use types::{Assignment, CandidatePair, MatchConstraints, PassengerRequest, TaxiCandidate};

/// Outcome of one solver invocation through [SolverResource].
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub assignments: Vec<Assignment>,
    /// Set when the primary solver failed and greedy produced the result.
    pub fallback_reason: Option<SolverError>,
}

impl SolveReport {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Resource wrapper for the primary solver, with greedy as the fallback.
#[derive(Resource)]
pub struct SolverResource {
    primary: Box<dyn AssignmentSolver>,
    fallback: GreedySolver,
}

impl SolverResource {
    pub fn new(primary: Box<dyn AssignmentSolver>) -> Self {
        Self {
            primary,
            fallback: GreedySolver,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        match config.kind {
            SolverKind::Hungarian => Self::new(Box::new(HungarianSolver::new(config.max_exact_pairs))),
            SolverKind::Greedy => Self::new(Box::new(GreedySolver)),
        }
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn solve(
        &self,
        taxis: &[TaxiCandidate],
        passengers: &[PassengerRequest],
        constraints: &MatchConstraints,
    ) -> SolveReport {
        match self.primary.solve(taxis, passengers, constraints) {
            Ok(assignments) => SolveReport {
                assignments,
                fallback_reason: None,
            },
            Err(err) => {
                warn!(
                    solver = self.primary.name(),
                    error = %err,
                    taxis = taxis.len(),
                    passengers = passengers.len(),
                    "primary solver failed, falling back to greedy"
                );
                let assignments = self
                    .fallback
                    .solve(taxis, passengers, constraints)
                    .unwrap_or_default();
                SolveReport {
                    assignments,
                    fallback_reason: Some(err),
                }
            }
        }
    }
}
