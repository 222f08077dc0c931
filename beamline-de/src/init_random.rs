use ndarray::{Array1, Array2};
use rand::Rng;

use crate::bounds::Bounds;

/// Builds the initial population.
///
/// Row 0 is `seed` when given (it is clamped into the box); every other row
/// is a uniform sample. Draws happen row by row, one per component.
pub(crate) fn init_random<R: Rng + ?Sized>(
    npop: usize,
    bounds: &Bounds,
    seed: Option<Array1<f64>>,
    rng: &mut R,
) -> Array2<f64> {
    let n = bounds.len();
    let mut pop = Array2::<f64>::zeros((npop, n));
    let first = match seed {
        Some(x) => bounds.clamp(&x),
        None => bounds.sample(rng),
    };
    pop.row_mut(0).assign(&first);
    for i in 1..npop {
        pop.row_mut(i).assign(&bounds.sample(rng));
    }
    pop
}
