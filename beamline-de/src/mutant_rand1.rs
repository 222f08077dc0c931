use ndarray::{Array1, Array2, Zip};
use rand::Rng;

use crate::distinct_indices::distinct_indices;

/// rand/1: `x_r1 + F (x_r2 - x_r3)`, helpers distinct from `target`.
pub(crate) fn mutant_rand1<R: Rng + ?Sized>(
    target: usize,
    pop: &Array2<f64>,
    f: f64,
    rng: &mut R,
) -> Array1<f64> {
    let helpers = distinct_indices(target, 3, pop.nrows(), rng);
    let (base, plus, minus) = (helpers[0], helpers[1], helpers[2]);

    Zip::from(pop.row(base))
        .and(pop.row(plus))
        .and(pop.row(minus))
        .map_collect(|&b, &p, &m| b + f * (p - m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_four_individuals_use_every_other_slot() {
        // row k holds 10^k, so the donor identifies which rows were drawn
        let pop = array![[1.0], [10.0], [100.0], [1000.0]];
        let allowed = [
            10.0 + 100.0 - 1000.0,
            10.0 + 1000.0 - 100.0,
            100.0 + 10.0 - 1000.0,
            100.0 + 1000.0 - 10.0,
            1000.0 + 10.0 - 100.0,
            1000.0 + 100.0 - 10.0,
        ];
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            let donor = mutant_rand1(0, &pop, 1.0, &mut rng);
            assert!(allowed.contains(&donor[0]), "donor {}", donor[0]);
        }
    }
}
