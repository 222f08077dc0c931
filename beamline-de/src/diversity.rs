use log::debug;
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::argmax::argmin;
use crate::bounds::Bounds;
use crate::evaluator::Evaluator;
use crate::objective::Objective;

/// Replaces the lowest-fitness slot with a fresh uniform sample.
///
/// The new vector is kept unconditionally and its fitness is re-evaluated
/// so the table stays in step with the population. Returns the slot index.
pub fn inject_diversity<R, E>(
    pop: &mut Array2<f64>,
    fitness: &mut Array1<f64>,
    bounds: &Bounds,
    objective: &Objective<'_, E>,
    rng: &mut R,
) -> usize
where
    R: Rng + ?Sized,
    E: Evaluator + ?Sized,
{
    let (worst, worst_f) = argmin(fitness);
    let fresh = bounds.sample(rng);
    let f = objective.score(&fresh);
    debug!(
        "diversity: slot {} ({:.6}) replaced by {:?} ({:.6})",
        worst,
        worst_f,
        fresh.to_vec(),
        f
    );
    pop.row_mut(worst).assign(&fresh);
    fitness[worst] = f;
    worst
}
