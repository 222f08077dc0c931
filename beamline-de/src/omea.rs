//! Interior-sampling refinement (OMEA).
//!
//! The population is sorted by vector value so that consecutive rows are
//! neighbours. The segment between each neighbouring pair is probed at its
//! two interior third-points; when the better probe beats the right-hand
//! individual, it takes that individual's place.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::cmp::Ordering;

use crate::evaluator::Evaluator;
use crate::objective::Objective;

/// Evaluator calls one pass costs for `n` individuals: `1 + 3 (n - 1)`.
pub fn omea_cost(n: usize) -> usize {
    if n == 0 { 0 } else { 1 + 3 * (n - 1) }
}

/// Lexicographic order on rows; NaN sorts by `total_cmp`.
fn lex_cmp(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.total_cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Sorts rows lexicographically and returns the reordered copy.
pub fn sort_population(pop: &Array2<f64>) -> Array2<f64> {
    let mut order: Vec<usize> = (0..pop.nrows()).collect();
    order.sort_by(|&a, &b| lex_cmp(pop.row(a), pop.row(b)));
    pop.select(Axis(0), &order)
}

/// The two interior third-points of the segment `a -> b`.
pub fn interior_points(a: &Array1<f64>, b: &Array1<f64>) -> [Array1<f64>; 2] {
    let step = (b - a) / 3.0;
    [a + &step, a + &(&step * 2.0)]
}

/// Runs one refinement pass.
///
/// Returns the sorted (possibly improved) population and a fitness table
/// parallel to it. Every row's fitness is the score it was given during
/// this pass, so the table is never stale.
pub fn omea<E: Evaluator + ?Sized>(
    population: &Array2<f64>,
    objective: &Objective<'_, E>,
) -> (Array2<f64>, Array1<f64>) {
    let n = population.nrows();
    let mut pop = sort_population(population);
    let mut fitness = Array1::<f64>::zeros(n);
    if n == 0 {
        return (pop, fitness);
    }

    debug!("omea: evaluating individual 1 of {}", n);
    fitness[0] = objective.score(&pop.row(0).to_owned());

    for i in 1..n {
        debug!("omea: evaluating individual {} of {}", i + 1, n);
        let left = pop.row(i - 1).to_owned();
        let right = pop.row(i).to_owned();
        let probes = interior_points(&left, &right);
        let probe_f: Vec<f64> = probes.iter().map(|p| objective.score(p)).collect();

        fitness[i] = objective.score(&right);

        // first maximum, as with a plain argmax
        let k = if probe_f[1] > probe_f[0] { 1 } else { 0 };
        if probe_f[k] > fitness[i] {
            debug!(
                "omea: interior sample {:?} ({:.6}) replaces {:?} ({:.6})",
                probes[k].to_vec(),
                probe_f[k],
                right.to_vec(),
                fitness[i]
            );
            pop.row_mut(i).assign(&probes[k]);
            fitness[i] = probe_f[k];
        }
    }

    (pop, fitness)
}
