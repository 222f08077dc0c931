//! The black-box fitness capability the optimizer consumes.

use ndarray::Array1;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::driver_link::DerivedParams;
use crate::error::EvalError;

/// A fitness source: higher is better.
///
/// Calls may be slow (a full wavefront propagation can take seconds) and
/// may return different values for the same input. The optimizer never
/// assumes smoothness or monotonicity.
///
/// Any `Fn(&Array1<f64>) -> f64` closure is an evaluator that never fails,
/// has no live state and ignores derived parameters.
pub trait Evaluator: Send + Sync {
    /// Scores one parameter vector.
    fn evaluate(&self, x: &Array1<f64>) -> Result<f64, EvalError>;

    /// Writes derived parameters to an optic before the next [`evaluate`](Self::evaluate).
    fn push_derived(&self, _optic: &str, _params: &DerivedParams) -> Result<(), EvalError> {
        Ok(())
    }

    /// Current live value of dimension `dim`, if the backend exposes one.
    fn current(&self, _dim: usize) -> Option<f64> {
        None
    }

    /// Called by the optimizer when a generation starts.
    ///
    /// Generation 0 is the initial refinement pass. The refinement pass and
    /// diversity injection that follow generation `g` belong to `g`.
    fn begin_generation(&self, _generation: usize) {}
}

impl<F> Evaluator for F
where
    F: Fn(&Array1<f64>) -> f64 + Send + Sync,
{
    fn evaluate(&self, x: &Array1<f64>) -> Result<f64, EvalError> {
        Ok(self(x))
    }
}

/// Runs every evaluation on a worker thread and gives up after `timeout`.
///
/// A call that misses the deadline is reported as [`EvalError::Timeout`];
/// the worker is detached and its late answer is dropped.
pub struct TimeoutEvaluator<E> {
    inner: Arc<E>,
    timeout: Duration,
}

impl<E> TimeoutEvaluator<E> {
    /// Wraps a shared evaluator.
    pub fn new(inner: Arc<E>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Deadline applied to each call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<E> Evaluator for TimeoutEvaluator<E>
where
    E: Evaluator + 'static,
{
    fn evaluate(&self, x: &Array1<f64>) -> Result<f64, EvalError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let x = x.clone();
        thread::Builder::new()
            .name("omea-eval".to_string())
            .spawn(move || {
                // receiver may be gone after a timeout
                let _ = tx.send(inner.evaluate(&x));
            })
            .map_err(|e| EvalError::Failed(format!("cannot spawn evaluation worker: {}", e)))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(EvalError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(EvalError::Disconnected),
        }
    }

    fn push_derived(&self, optic: &str, params: &DerivedParams) -> Result<(), EvalError> {
        self.inner.push_derived(optic, params)
    }

    fn current(&self, dim: usize) -> Option<f64> {
        self.inner.current(dim)
    }

    fn begin_generation(&self, generation: usize) {
        self.inner.begin_generation(generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Sleepy(Duration);

    impl Evaluator for Sleepy {
        fn evaluate(&self, x: &Array1<f64>) -> Result<f64, EvalError> {
            thread::sleep(self.0);
            Ok(x.sum())
        }

        fn current(&self, dim: usize) -> Option<f64> {
            Some(dim as f64)
        }
    }

    struct Panicky;

    impl Evaluator for Panicky {
        fn evaluate(&self, _x: &Array1<f64>) -> Result<f64, EvalError> {
            panic!("simulator crashed");
        }
    }

    #[test]
    fn test_closure_is_evaluator() {
        let f = |x: &Array1<f64>| -x[0];
        assert_eq!(f.evaluate(&array![2.0]), Ok(-2.0));
        assert_eq!(f.current(0), None);
    }

    #[test]
    fn test_timeout_passes_fast_calls() {
        let ev = TimeoutEvaluator::new(
            Arc::new(Sleepy(Duration::from_millis(1))),
            Duration::from_secs(5),
        );
        assert_eq!(ev.evaluate(&array![1.0, 2.0]), Ok(3.0));
        assert_eq!(ev.current(4), Some(4.0));
    }

    #[test]
    fn test_timeout_reports_slow_calls() {
        let ev = TimeoutEvaluator::new(
            Arc::new(Sleepy(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        assert_eq!(
            ev.evaluate(&array![1.0]),
            Err(EvalError::Timeout(Duration::from_millis(20)))
        );
    }

    #[test]
    fn test_worker_panic_is_disconnect() {
        let ev = TimeoutEvaluator::new(Arc::new(Panicky), Duration::from_secs(5));
        assert_eq!(ev.evaluate(&array![1.0]), Err(EvalError::Disconnected));
    }
}
