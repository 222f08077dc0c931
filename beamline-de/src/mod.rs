//! Differential Evolution with interior-sampling refinement for beamline tuning.
//!
//! This crate tunes a small vector of physical parameters (aperture sizes,
//! grazing angles, radii) against a slow, noisy, black-box fitness such as
//! the mean intensity at a simulated watchpoint. Fitness is maximized.
//!
//! Each run alternates classic DE generations (mutation, binomial crossover
//! and greedy selection) with an OMEA pass, which probes the segments
//! between neighbouring individuals, and with diversity injection, which
//! replaces the worst individual by a fresh random sample.
//!
//! # Features
//!
//! - Five mutation strategies: rand/1, best/1, current-to-best/1, best/2, rand/2
//! - Interior-sampling refinement between generations (OMEA)
//! - Derived-parameter links keeping optic normal/tangent vectors consistent
//!   with a grazing angle
//! - Retry-then-penalize evaluation failures, optional per-call timeout
//! - Optional parallel evaluation of one generation's trial/target pairs
//! - Per-generation trace and CSV evaluation recording
//!
//! # Example
//!
//! ```rust
//! use beamline_de::{OmeaConfigBuilder, Strategy, differential_evolution};
//! use ndarray::Array1;
//!
//! // Maximize a paraboloid peaked at (0.5, 0.5)
//! let peak = |x: &Array1<f64>| -(x[0] - 0.5).powi(2) - (x[1] - 0.5).powi(2);
//! let config = OmeaConfigBuilder::new()
//!     .popsize(8)
//!     .strategy(Strategy::Best1)
//!     .mutation(0.5)
//!     .recombination(0.8)
//!     .threshold(-0.01)
//!     .seed(42)
//!     .build()
//!     .expect("invalid config");
//!
//! let report = differential_evolution(&peak, &[(0.0, 1.0), (0.0, 1.0)], config)
//!     .expect("optimization should start");
//!
//! assert!(report.fun > -0.05);
//! ```
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod error;
pub use error::{DEError, EvalError, Result};

use log::{info, warn};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Index helpers over fitness tables.
mod argmax;
/// Per-dimension box constraints and clamping.
pub mod bounds;
/// Stagnation tracking and termination.
pub mod convergence;
/// File-based run configuration.
pub mod config;
/// Worst-slot replacement by a random sample.
pub mod diversity;
/// Grazing-angle driven normal/tangential vector maintenance.
pub mod driver_link;
/// The fitness capability consumed by the optimizer.
pub mod evaluator;
/// Retry, failure and derived-parameter handling around an evaluator.
pub mod objective;
/// Interior-sampling refinement between generations.
pub mod omea;

/// Utilities for selecting distinct random indices from a population.
pub mod distinct_indices;
/// Random uniform initialization strategy.
pub mod init_random;

/// Best/1 mutation strategy: uses best individual plus one difference vector.
pub mod mutant_best1;
/// Best/2 mutation strategy: uses best individual plus two difference vectors.
pub mod mutant_best2;
/// Current-to-best/1 mutation: blends current with best individual.
pub mod mutant_current_to_best1;
/// Rand/1 mutation strategy: uses random individual plus one difference vector.
pub mod mutant_rand1;
/// Rand/2 mutation strategy: uses random individual plus two difference vectors.
pub mod mutant_rand2;

/// Binomial (uniform) crossover implementation.
pub mod crossover_binomial;

/// Comprehensive tests for the generational loop.
#[cfg(test)]
mod de_tests;
/// Convenience entry point.
pub mod differential_evolution;
/// Maximize-oriented test landscapes for demos and benchmarks.
pub mod function_registry;
/// Internal helper functions for the generational loop.
pub mod impl_helpers;
/// Parallel batch evaluation support.
pub mod parallel_eval;
/// Evaluation recording for analysis and debugging.
pub mod recorder;
/// Recorded optimization wrapper.
pub mod run_recorded;

pub use bounds::Bounds;
pub use config::RunConfig;
pub use convergence::{ConvergenceState, Verdict};
pub use differential_evolution::differential_evolution;
pub use driver_link::{Coupling, DerivedParams, DriverLink};
pub use evaluator::{Evaluator, TimeoutEvaluator};
pub use objective::Objective;
pub use parallel_eval::ParallelConfig;
pub use recorder::{OptimizationRecorder, RecordingEvaluator};
pub use run_recorded::run_recorded_omea;

/// Callback function type
pub type CallbackFn = Box<dyn FnMut(&Intermediate<'_>) -> CallbackAction>;

/// Mutation strategy used to build donor vectors.
///
/// The strategy is fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// rand/1: random base + 1 difference vector
    #[default]
    #[serde(rename = "rand/1", alias = "rand1")]
    Rand1,
    /// best/1: best individual + 1 difference vector
    #[serde(rename = "best/1", alias = "best1")]
    Best1,
    /// current-to-best/1: pull toward the best + 1 difference vector
    #[serde(rename = "current-to-best/1", alias = "currenttobest1")]
    CurrentToBest1,
    /// best/2: best individual + 2 difference vectors
    #[serde(rename = "best/2", alias = "best2")]
    Best2,
    /// rand/2: random base + 2 difference vectors
    #[serde(rename = "rand/2", alias = "rand2")]
    Rand2,
}

impl Strategy {
    /// All strategies, in declaration order.
    pub const ALL: [Strategy; 5] = [
        Strategy::Rand1,
        Strategy::Best1,
        Strategy::CurrentToBest1,
        Strategy::Best2,
        Strategy::Rand2,
    ];

    /// Conventional `base/n` name.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Rand1 => "rand/1",
            Strategy::Best1 => "best/1",
            Strategy::CurrentToBest1 => "current-to-best/1",
            Strategy::Best2 => "best/2",
            Strategy::Rand2 => "rand/2",
        }
    }

    /// Distinct helper individuals drawn per donor (the target excluded).
    pub fn helpers(&self) -> usize {
        match self {
            Strategy::Rand1 => 3,
            Strategy::Best1 | Strategy::CurrentToBest1 => 2,
            Strategy::Best2 => 4,
            Strategy::Rand2 => 5,
        }
    }

    /// Smallest population this strategy accepts.
    pub fn min_popsize(&self) -> usize {
        (self.helpers() + 1).max(MIN_POPSIZE)
    }

    /// Builds a donor for slot `i` and clamps it into `bounds`.
    ///
    /// `best_idx` is the slot with the highest recorded fitness.
    pub fn donor<R: Rng + ?Sized>(
        &self,
        i: usize,
        pop: &Array2<f64>,
        best_idx: usize,
        f: f64,
        bounds: &Bounds,
        rng: &mut R,
    ) -> Array1<f64> {
        use mutant_best1::mutant_best1;
        use mutant_best2::mutant_best2;
        use mutant_current_to_best1::mutant_current_to_best1;
        use mutant_rand1::mutant_rand1;
        use mutant_rand2::mutant_rand2;

        let mut donor = match self {
            Strategy::Rand1 => mutant_rand1(i, pop, f, rng),
            Strategy::Best1 => mutant_best1(i, pop, best_idx, f, rng),
            Strategy::CurrentToBest1 => mutant_current_to_best1(i, pop, best_idx, f, rng),
            Strategy::Best2 => mutant_best2(i, pop, best_idx, f, rng),
            Strategy::Rand2 => mutant_rand2(i, pop, f, rng),
        };
        bounds.clamp_in_place(&mut donor);
        donor
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = DEError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let t = s.to_lowercase();
        match t.as_str() {
            "rand/1" | "rand1" => Ok(Strategy::Rand1),
            "best/1" | "best1" => Ok(Strategy::Best1),
            "current-to-best/1" | "currenttobest1" | "current_to_best1" => {
                Ok(Strategy::CurrentToBest1)
            }
            "best/2" | "best2" => Ok(Strategy::Best2),
            "rand/2" | "rand2" => Ok(Strategy::Rand2),
            _ => Err(DEError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Smallest population accepted by any strategy.
pub const MIN_POPSIZE: usize = 4;

/// Configuration for the OMEA differential evolution optimizer.
pub struct OmeaConfig {
    /// Number of individuals; constant for the whole run.
    pub popsize: usize,
    /// Crossover probability CR in [0, 1].
    pub recombination: f64,
    /// Mutation scale factor F, finite and non-negative.
    pub mutation: f64,
    /// Minimum best fitness required before stagnation may stop the run.
    pub threshold: f64,
    /// Mutation strategy.
    pub strategy: Strategy,
    /// Generation limit; reaching it is a normal, non-converged stop.
    pub max_generations: usize,
    /// Consecutive stagnant generations needed to converge.
    pub patience: usize,
    /// Decimal places used when comparing best fitness between generations.
    pub decimals: i32,
    /// Optional random seed for reproducibility.
    pub seed: Option<u64>,
    /// Optional first individual; overrides the evaluator's live values.
    pub x0: Option<Array1<f64>>,
    /// Derived-parameter links pushed before every evaluation.
    pub links: Vec<DriverLink>,
    /// Retries per failed evaluation before scoring it negative infinity.
    pub retries: usize,
    /// Replace the worst individual by a random sample after each generation.
    pub inject_diversity: bool,
    /// Optional per-generation callback (may stop early).
    pub callback: Option<CallbackFn>,
    /// Parallel evaluation configuration.
    pub parallel: ParallelConfig,
}

impl Default for OmeaConfig {
    fn default() -> Self {
        Self {
            popsize: 10,
            recombination: 0.8,
            mutation: 0.5,
            threshold: 0.0,
            strategy: Strategy::default(),
            max_generations: 100,
            patience: 5,
            decimals: 3,
            seed: None,
            x0: None,
            links: Vec::new(),
            retries: 1,
            inject_diversity: true,
            callback: None,
            parallel: ParallelConfig::default(),
        }
    }
}

impl fmt::Debug for OmeaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmeaConfig")
            .field("popsize", &self.popsize)
            .field("recombination", &self.recombination)
            .field("mutation", &self.mutation)
            .field("threshold", &self.threshold)
            .field("strategy", &self.strategy)
            .field("max_generations", &self.max_generations)
            .field("patience", &self.patience)
            .field("decimals", &self.decimals)
            .field("seed", &self.seed)
            .field("x0", &self.x0.as_ref().map(|x| x.to_vec()))
            .field("links", &self.links)
            .field("retries", &self.retries)
            .field("inject_diversity", &self.inject_diversity)
            .field("callback", &self.callback.is_some())
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl OmeaConfig {
    /// Checks every option that does not depend on the problem dimension.
    pub fn validate(&self) -> Result<()> {
        if self.popsize < self.strategy.min_popsize() {
            return Err(DEError::PopulationTooSmall {
                pop_size: self.popsize,
                strategy: self.strategy.name(),
                required: self.strategy.min_popsize(),
            });
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(DEError::InvalidCrossoverRate {
                rate: self.recombination,
            });
        }
        if !self.mutation.is_finite() || self.mutation < 0.0 {
            return Err(DEError::InvalidMutationFactor {
                factor: self.mutation,
            });
        }
        if self.max_generations == 0 {
            return Err(DEError::ZeroGenerations);
        }
        Ok(())
    }

    /// Checks options that depend on the number of dimensions.
    pub fn validate_for(&self, dims: usize) -> Result<()> {
        self.validate()?;
        DriverLink::validate(&self.links, dims)?;
        if let Some(x0) = &self.x0 {
            if x0.len() != dims {
                return Err(DEError::X0DimensionMismatch {
                    expected: dims,
                    got: x0.len(),
                });
            }
        }
        Ok(())
    }
}

/// Fluent builder for `OmeaConfig` for ergonomic configuration.
///
/// # Example
///
/// ```rust
/// use beamline_de::{OmeaConfigBuilder, Strategy};
///
/// let config = OmeaConfigBuilder::new()
///     .popsize(5)
///     .strategy(Strategy::Best1)
///     .mutation(0.1)
///     .recombination(0.8)
///     .threshold(0.0)
///     .seed(42)
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.max_generations, 100);
/// ```
pub struct OmeaConfigBuilder {
    cfg: OmeaConfig,
}

impl Default for OmeaConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OmeaConfigBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            cfg: OmeaConfig::default(),
        }
    }
    /// Sets the population size.
    pub fn popsize(mut self, v: usize) -> Self {
        self.cfg.popsize = v;
        self
    }
    /// Sets the crossover probability (CR).
    pub fn recombination(mut self, v: f64) -> Self {
        self.cfg.recombination = v;
        self
    }
    /// Sets the mutation scale factor (F).
    pub fn mutation(mut self, v: f64) -> Self {
        self.cfg.mutation = v;
        self
    }
    /// Sets the fitness threshold for convergence.
    pub fn threshold(mut self, v: f64) -> Self {
        self.cfg.threshold = v;
        self
    }
    /// Sets the mutation strategy.
    pub fn strategy(mut self, v: Strategy) -> Self {
        self.cfg.strategy = v;
        self
    }
    /// Sets the generation limit.
    pub fn max_generations(mut self, v: usize) -> Self {
        self.cfg.max_generations = v;
        self
    }
    /// Sets the stagnation patience.
    pub fn patience(mut self, v: usize) -> Self {
        self.cfg.patience = v;
        self
    }
    /// Sets the rounding precision of the stagnation comparison.
    pub fn decimals(mut self, v: i32) -> Self {
        self.cfg.decimals = v;
        self
    }
    /// Sets the random seed for reproducibility.
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    /// Sets an explicit first individual.
    pub fn x0(mut self, v: Array1<f64>) -> Self {
        self.cfg.x0 = Some(v);
        self
    }
    /// Adds a derived-parameter link.
    pub fn link(mut self, link: DriverLink) -> Self {
        self.cfg.links.push(link);
        self
    }
    /// Sets the retry count for failed evaluations.
    pub fn retries(mut self, v: usize) -> Self {
        self.cfg.retries = v;
        self
    }
    /// Enables/disables diversity injection.
    pub fn inject_diversity(mut self, v: bool) -> Self {
        self.cfg.inject_diversity = v;
        self
    }
    /// Sets a per-generation callback function.
    pub fn callback(mut self, cb: CallbackFn) -> Self {
        self.cfg.callback = Some(cb);
        self
    }
    /// Sets the parallel evaluation configuration.
    pub fn parallel(mut self, parallel: ParallelConfig) -> Self {
        self.cfg.parallel = parallel;
        self
    }
    /// Enables/disables parallel evaluation.
    pub fn enable_parallel(mut self, enable: bool) -> Self {
        self.cfg.parallel.enabled = enable;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a population too small for the
    /// strategy, CR outside [0, 1], a negative or non-finite F or a zero
    /// generation limit.
    pub fn build(self) -> Result<OmeaConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Stagnation patience reached with best fitness at or above threshold.
    Converged,
    /// Generation limit reached.
    MaxGenerations,
    /// The callback asked to stop.
    Callback,
}

/// Best-of-generation summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// 1-based generation number.
    pub generation: usize,
    /// Best fitness after selection.
    pub best_f: f64,
    /// Individual holding `best_f`.
    pub best_x: Vec<f64>,
    /// Stagnation counter after this generation.
    pub stagnation: usize,
    /// Trials that replaced their target.
    pub accepted: usize,
    /// Evaluator calls so far.
    pub nfev: usize,
}

/// Result of an optimization run.
#[derive(Clone)]
pub struct OmeaReport {
    /// Best individual of the final population.
    pub x: Array1<f64>,
    /// Fitness of `x`.
    pub fun: f64,
    /// Why the run stopped.
    pub termination: Termination,
    /// Human-readable status message.
    pub message: String,
    /// Number of generations performed.
    pub generations: usize,
    /// Number of evaluator invocations (retries included).
    pub nfev: usize,
    /// Candidates scored negative infinity after exhausting retries.
    pub failed_evaluations: usize,
    /// Final population (popsize x n).
    pub population: Array2<f64>,
    /// Fitness of each final population row.
    pub fitness: Array1<f64>,
    /// Per-generation best trace.
    pub trace: Vec<GenerationRecord>,
}

impl OmeaReport {
    /// True when the stagnation criterion stopped the run.
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

impl fmt::Debug for OmeaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmeaReport")
            .field("x", &self.x.to_vec())
            .field("fun", &self.fun)
            .field("termination", &self.termination)
            .field("message", &self.message)
            .field("generations", &self.generations)
            .field("nfev", &self.nfev)
            .field(
                "population",
                &format!("{}x{}", self.population.nrows(), self.population.ncols()),
            )
            .field("trace", &format!("len={}", self.trace.len()))
            .finish()
    }
}

/// Information passed to callback after each generation's selection.
pub struct Intermediate<'a> {
    /// Generation number (1-based).
    pub generation: usize,
    /// Current best solution vector.
    pub x: Array1<f64>,
    /// Current best fitness.
    pub fun: f64,
    /// Stagnation counter.
    pub stagnation: usize,
    /// Trials accepted this generation.
    pub accepted: usize,
    /// Population after selection.
    pub population: &'a Array2<f64>,
    /// Fitness table after selection.
    pub fitness: &'a Array1<f64>,
}

/// Action returned by callback to control optimization flow.
pub enum CallbackAction {
    /// Continue optimization.
    Continue,
    /// Stop optimization early.
    Stop,
}

/// Differential Evolution optimizer with OMEA refinement.
///
/// Use [`OmeaDE::new`] to create an instance, configure with
/// [`config_mut`](Self::config_mut), then call [`solve`](Self::solve).
pub struct OmeaDE<'a, E>
where
    E: Evaluator + ?Sized,
{
    evaluator: &'a E,
    bounds: Bounds,
    config: OmeaConfig,
}

impl<'a, E> OmeaDE<'a, E>
where
    E: Evaluator + ?Sized,
{
    /// Creates a new optimizer over `evaluator` and bounds [lower, upper].
    ///
    /// # Errors
    ///
    /// Returns a bounds error when the arrays differ in length, are empty,
    /// or have a lower bound above its upper bound.
    pub fn new(evaluator: &'a E, lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        Ok(Self::with_bounds(evaluator, Bounds::new(lower, upper)?))
    }

    /// Creates a new optimizer from validated bounds.
    pub fn with_bounds(evaluator: &'a E, bounds: Bounds) -> Self {
        Self {
            evaluator,
            bounds,
            config: OmeaConfig::default(),
        }
    }

    /// Mutable access to configuration
    pub fn config_mut(&mut self) -> &mut OmeaConfig {
        &mut self.config
    }

    /// The search box.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Run the optimization and return a report.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before the evaluator is called.
    /// Evaluation failures never abort the run.
    pub fn solve(&mut self) -> Result<OmeaReport> {
        use diversity::inject_diversity;
        use omea::{omea, omea_cost};

        let n = self.bounds.len();
        self.config.validate_for(n)?;

        let npop = self.config.popsize;
        let start = Instant::now();

        // Configure global rayon thread pool once if requested
        if let Some(threads) = self.config.parallel.num_threads {
            // Ignore error if global pool already set
            let _ = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global();
        }

        let mut rng: StdRng = match self.config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };

        let links = std::mem::take(&mut self.config.links);
        let objective = Objective::new(self.evaluator, &links, self.config.retries);

        info!(
            "OMEA init: {} dimensions, population={}, strategy={}, F={}, CR={}, threshold={}, max_generations={}",
            n,
            npop,
            self.config.strategy,
            self.config.mutation,
            self.config.recombination,
            self.config.threshold,
            self.config.max_generations
        );

        // row 0 from the live state, the rest uniform
        let seed_row = self.seed_individual(&objective);
        let pop0 = init_random::init_random(npop, &self.bounds, seed_row, &mut rng);

        info!("initial OMEA pass: {} evaluations", omea_cost(npop));
        objective.begin_generation(0);
        let (mut pop, mut fitness) = omea(&pop0, &objective);

        let mut state = ConvergenceState::new(
            self.config.patience,
            self.config.threshold,
            self.config.max_generations,
            self.config.decimals,
        );
        let mut trace: Vec<GenerationRecord> = Vec::new();

        let termination = loop {
            let generation = state.generation() + 1;
            info!("generation {}: mutation, crossover and selection", generation);
            objective.begin_generation(generation);

            let accepted = if self.config.parallel.enabled && !objective.has_links() {
                self.generation_batched(&mut pop, &mut fitness, &objective, &mut rng)
            } else {
                self.generation_sequential(&mut pop, &mut fitness, &objective, &mut rng)
            };

            let (best_idx, best_f) = argmax::argmax(&fitness);
            let best_x = pop.row(best_idx).to_owned();
            let verdict = state.update(best_f);

            info!(
                "generation {}: best={:.6} at {:?}, accepted={}/{}, stagnation={}, nfev={}",
                generation,
                best_f,
                best_x.to_vec(),
                accepted,
                npop,
                state.stagnant(),
                objective.nfev()
            );
            trace.push(GenerationRecord {
                generation,
                best_f,
                best_x: best_x.to_vec(),
                stagnation: state.stagnant(),
                accepted,
                nfev: objective.nfev(),
            });

            if let Some(ref mut cb) = self.config.callback {
                let intermediate = Intermediate {
                    generation,
                    x: best_x,
                    fun: best_f,
                    stagnation: state.stagnant(),
                    accepted,
                    population: &pop,
                    fitness: &fitness,
                };
                if let CallbackAction::Stop = cb(&intermediate) {
                    break Termination::Callback;
                }
            }

            match verdict {
                Verdict::Converged => break Termination::Converged,
                Verdict::MaxGenerations => {
                    warn!(
                        "stopping after {} generations without convergence",
                        self.config.max_generations
                    );
                    break Termination::MaxGenerations;
                }
                Verdict::Continue => {}
            }

            let (refined, refined_f) = omea(&pop, &objective);
            pop = refined;
            fitness = refined_f;

            if self.config.inject_diversity {
                inject_diversity(&mut pop, &mut fitness, &self.bounds, &objective, &mut rng);
            }
        };

        let report = self.finish_report(pop, fitness, termination, &state, &objective, trace);
        self.config.links = links;

        info!(
            "OMEA finished: {} (best={:.6}, {} evaluations, {:.1}s)",
            report.message,
            report.fun,
            report.nfev,
            start.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}
