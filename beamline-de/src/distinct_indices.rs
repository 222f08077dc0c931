use rand::Rng;
use rand::seq::SliceRandom;

/// Draws `count` distinct indices from `0..pool_size`, never `exclude`.
///
/// Consumes exactly one shuffle of the pool from `rng`, which keeps the
/// draw order fixed for seeded runs.
pub(crate) fn distinct_indices<R: Rng + ?Sized>(
    exclude: usize,
    count: usize,
    pool_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    debug_assert!(count <= pool_size.saturating_sub(1));
    let mut idxs: Vec<usize> = (0..pool_size).collect();
    idxs.shuffle(rng);
    idxs.into_iter()
        .filter(|&idx| idx != exclude)
        .take(count)
        .collect()
}
