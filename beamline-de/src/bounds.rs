use ndarray::{Array1, Zip};
use rand::Rng;

use crate::{DEError, Result};

/// Per-dimension inclusive box `[lower, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Bounds {
    /// Builds bounds from separate lower/upper arrays.
    ///
    /// # Errors
    ///
    /// Returns `DEError::EmptyBounds` for zero dimensions,
    /// `DEError::BoundsMismatch` for arrays of different lengths and
    /// `DEError::InvalidBounds` when `lower > upper` or a bound is not finite.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(DEError::BoundsMismatch {
                lower_len: lower.len(),
                upper_len: upper.len(),
            });
        }
        if lower.is_empty() {
            return Err(DEError::EmptyBounds);
        }
        for i in 0..lower.len() {
            if !(lower[i].is_finite() && upper[i].is_finite()) || lower[i] > upper[i] {
                return Err(DEError::InvalidBounds {
                    index: i,
                    lower: lower[i],
                    upper: upper[i],
                });
            }
        }
        Ok(Self { lower, upper })
    }

    /// Builds bounds from `(min, max)` pairs, one per dimension.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let lower = pairs.iter().map(|&(lo, _)| lo).collect::<Array1<f64>>();
        let upper = pairs.iter().map(|&(_, hi)| hi).collect::<Array1<f64>>();
        Self::new(lower, upper)
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Always false once constructed; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower bounds.
    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    /// Upper bounds.
    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Clamps `x` in place: components below `min` become `min`, above `max` become `max`.
    pub fn clamp_in_place(&self, x: &mut Array1<f64>) {
        Zip::from(x)
            .and(&self.lower)
            .and(&self.upper)
            .for_each(|v, &lo, &hi| {
                if *v < lo {
                    *v = lo;
                } else if *v > hi {
                    *v = hi;
                }
            });
    }

    /// Returns a clamped copy of `x`.
    pub fn clamp(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut out = x.clone();
        self.clamp_in_place(&mut out);
        out
    }

    /// True when every component lies in its `[min, max]`.
    pub fn contains(&self, x: &Array1<f64>) -> bool {
        x.len() == self.len()
            && Zip::from(x)
                .and(&self.lower)
                .and(&self.upper)
                .all(|&v, &lo, &hi| lo <= v && v <= hi)
    }

    /// Draws one uniform sample, one random number per dimension in order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        Zip::from(&self.lower)
            .and(&self.upper)
            .map_collect(|&lo, &hi| {
                let u: f64 = rng.random::<f64>();
                lo + u * (hi - lo)
            })
    }
}
