//! Stagnation tracking and termination.

/// Outcome of one generation's convergence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep iterating.
    Continue,
    /// Best fitness stagnated for `patience` generations at or above threshold.
    Converged,
    /// Generation limit reached first.
    MaxGenerations,
}

/// Rounds `v` to `decimals` decimal places.
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

/// Generation counter plus stagnation bookkeeping.
#[derive(Debug, Clone)]
pub struct ConvergenceState {
    generation: usize,
    stagnant: usize,
    last_best: Option<f64>,
    patience: usize,
    threshold: f64,
    max_generations: usize,
    decimals: i32,
}

impl ConvergenceState {
    /// Fresh state for a run.
    pub fn new(patience: usize, threshold: f64, max_generations: usize, decimals: i32) -> Self {
        Self {
            generation: 0,
            stagnant: 0,
            last_best: None,
            patience,
            threshold,
            max_generations,
            decimals,
        }
    }

    /// Records the best fitness of a finished generation.
    ///
    /// The stagnation counter grows when the rounded best equals the
    /// previous rounded best, and resets otherwise.
    pub fn update(&mut self, best: f64) -> Verdict {
        self.generation += 1;
        let rounded = round_to(best, self.decimals);
        match self.last_best {
            Some(prev) if round_to(prev, self.decimals) == rounded => self.stagnant += 1,
            _ => self.stagnant = 0,
        }
        self.last_best = Some(best);

        if self.stagnant >= self.patience && best >= self.threshold {
            Verdict::Converged
        } else if self.generation >= self.max_generations {
            Verdict::MaxGenerations
        } else {
            Verdict::Continue
        }
    }

    /// Generations recorded so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Consecutive generations with an unchanged rounded best.
    pub fn stagnant(&self) -> usize {
        self.stagnant
    }

    /// Best fitness of the last recorded generation.
    pub fn last_best(&self) -> Option<f64> {
        self.last_best
    }
}
