//! Benching policy port
//!
//! Decides which participants are taken off the team. Consulted each time
//! the orchestrator moves to a new hypothesis.

use hypoloop_domain::Plan;
use std::collections::BTreeMap;

pub trait BenchingPolicy: Send + Sync {
    /// Names to bench, given the plan and consecutive failures per participant
    fn members_to_bench(&self, plan: &Plan, failures: &BTreeMap<String, usize>) -> Vec<String>;
}

/// Leaves benching entirely to the planner
pub struct NeverBench;

impl BenchingPolicy for NeverBench {
    fn members_to_bench(&self, _plan: &Plan, _failures: &BTreeMap<String, usize>) -> Vec<String> {
        Vec::new()
    }
}

/// Benches a participant after a number of consecutive failures
pub struct BenchAfterFailures(pub usize);

impl BenchingPolicy for BenchAfterFailures {
    fn members_to_bench(&self, plan: &Plan, failures: &BTreeMap<String, usize>) -> Vec<String> {
        failures
            .iter()
            .filter(|(name, count)| **count >= self.0 && !plan.is_benched(name))
            .map(|(name, _)| name.clone())
            .collect()
    }
}
