use log::{debug, warn};
use ndarray::Array1;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::driver_link::DriverLink;
use crate::error::EvalError;
use crate::evaluator::Evaluator;

/// Scores candidates through an [`Evaluator`].
///
/// Before each call every driver link pushes its derived parameters. A
/// failed attempt (push or evaluation, or a NaN result) is retried up to
/// `retries` times; after that the candidate scores `f64::NEG_INFINITY`
/// so it can neither win a selection nor become the best individual.
pub struct Objective<'a, E: Evaluator + ?Sized> {
    evaluator: &'a E,
    links: &'a [DriverLink],
    retries: usize,
    nfev: AtomicUsize,
    failures: AtomicUsize,
}

impl<'a, E: Evaluator + ?Sized> Objective<'a, E> {
    /// Wraps `evaluator`; `links` may be empty.
    pub fn new(evaluator: &'a E, links: &'a [DriverLink], retries: usize) -> Self {
        Self {
            evaluator,
            links,
            retries,
            nfev: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Fitness of `x`, or negative infinity once retries are exhausted.
    pub fn score(&self, x: &Array1<f64>) -> f64 {
        for attempt in 0..=self.retries {
            match self.attempt(x) {
                Ok(f) => return f,
                Err(e) => {
                    warn!(
                        "evaluation attempt {}/{} failed: {}",
                        attempt + 1,
                        self.retries + 1,
                        e
                    );
                }
            }
        }
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!("candidate {:?} scored -inf after repeated failures", x.to_vec());
        f64::NEG_INFINITY
    }

    fn attempt(&self, x: &Array1<f64>) -> Result<f64, EvalError> {
        for link in self.links {
            let params = link.derive(x);
            debug!("push {} -> {}", link.optic, params);
            self.evaluator.push_derived(&link.optic, &params)?;
        }
        self.nfev.fetch_add(1, Ordering::Relaxed);
        let f = self.evaluator.evaluate(x)?;
        if f.is_nan() {
            return Err(EvalError::NonFinite(f));
        }
        Ok(f)
    }

    /// Evaluator invocations so far, retries included.
    pub fn nfev(&self) -> usize {
        self.nfev.load(Ordering::Relaxed)
    }

    /// Candidates that exhausted their retries.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// True when derived parameters are pushed before evaluations.
    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    /// Tells the evaluator a new generation starts.
    pub fn begin_generation(&self, generation: usize) {
        self.evaluator.begin_generation(generation);
    }

    /// Live value of a dimension from the underlying evaluator.
    pub fn current(&self, dim: usize) -> Option<f64> {
        self.evaluator.current(dim)
    }
}
