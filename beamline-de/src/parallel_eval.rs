use log::warn;
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::evaluator::Evaluator;
use crate::objective::Objective;

/// Parallel evaluation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Evaluate one generation's trial/target pairs as a parallel batch
    #[serde(default)]
    pub enabled: bool,
    /// Number of threads to use (None = use rayon default)
    #[serde(default)]
    pub num_threads: Option<usize>,
}

/// Evaluate a batch of candidates, preserving input order in the output.
///
/// Runs on the rayon pool when `config.enabled` and the batch has at least
/// four candidates. Batches whose objective pushes derived parameters are
/// always evaluated sequentially: each push must be followed by its own
/// evaluation before the next push.
pub fn evaluate_batch<E>(
    candidates: &[Array1<f64>],
    objective: &Objective<'_, E>,
    config: &ParallelConfig,
) -> Vec<f64>
where
    E: Evaluator + ?Sized,
{
    if config.enabled && objective.has_links() {
        warn!("parallel evaluation disabled: driver links need paired push/evaluate calls");
    }
    if !config.enabled || objective.has_links() || candidates.len() < 4 {
        return candidates.iter().map(|x| objective.score(x)).collect();
    }

    // Always use global thread pool (configured once in solver)
    candidates.par_iter().map(|x| objective.score(x)).collect()
}
