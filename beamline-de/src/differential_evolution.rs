use crate::evaluator::Evaluator;
use crate::{Bounds, OmeaConfig, OmeaDE, OmeaReport, Result};

/// Runs an OMEA optimization over the given `(lower, upper)` pairs.
///
/// Convenience wrapper around [`OmeaDE`]: builds the bounds, installs
/// `config` and solves.
///
/// # Errors
///
/// Returns a bounds error for an empty or inverted box, or a configuration
/// error from [`OmeaConfig::validate_for`].
///
/// # Example
///
/// ```rust
/// use beamline_de::{differential_evolution, OmeaConfigBuilder};
/// use ndarray::Array1;
///
/// let report = differential_evolution(
///     &|x: &Array1<f64>| -(x[0] - 1.0).powi(2),
///     &[(-5.0, 5.0)],
///     OmeaConfigBuilder::new().popsize(8).seed(42).build().expect("valid config"),
/// ).expect("optimization failed");
///
/// assert!(report.fun <= 0.0);
/// ```
pub fn differential_evolution<E>(
    evaluator: &E,
    bounds: &[(f64, f64)],
    config: OmeaConfig,
) -> Result<OmeaReport>
where
    E: Evaluator + ?Sized,
{
    let mut de = OmeaDE::with_bounds(evaluator, Bounds::from_pairs(bounds)?);
    *de.config_mut() = config;
    de.solve()
}
