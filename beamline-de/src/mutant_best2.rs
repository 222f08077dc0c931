use ndarray::{Array1, Array2};
use rand::Rng;

use crate::distinct_indices::distinct_indices;

/// best/2: `x_best + F (x_r1 - x_r2) + F (x_r3 - x_r4)`.
pub(crate) fn mutant_best2<R: Rng + ?Sized>(
    i: usize,
    pop: &Array2<f64>,
    best_idx: usize,
    f: f64,
    rng: &mut R,
) -> Array1<f64> {
    let idxs = distinct_indices(i, 4, pop.nrows(), rng);
    let r0 = idxs[0];
    let r1 = idxs[1];
    let r2 = idxs[2];
    let r3 = idxs[3];
    &pop.row(best_idx).to_owned()
        + &((&pop.row(r0) - &pop.row(r1)) * f)
        + &((&pop.row(r2) - &pop.row(r3)) * f)
}
