use ndarray::Array1;
use rand::Rng;

/// Binomial crossover: each component comes from the donor when a fresh
/// uniform draw in `[0, 1)` is `<= cr`, otherwise from the target.
///
/// One draw per component, in dimension order. With `cr = 1` the trial is
/// the donor; with `cr = 0` it is the target unless a draw is exactly zero.
pub(crate) fn binomial_crossover<R: Rng + ?Sized>(
    target: &Array1<f64>,
    donor: &Array1<f64>,
    cr: f64,
    rng: &mut R,
) -> Array1<f64> {
    let mut trial = target.clone();
    for j in 0..target.len() {
        if rng.random::<f64>() <= cr {
            trial[j] = donor[j];
        }
    }
    trial
}
