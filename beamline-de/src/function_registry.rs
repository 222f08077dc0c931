//! Maximize-oriented test landscapes for demos, the CLI and benchmarks.
//!
//! Each landscape mimics a beam-intensity figure of merit on the unit box:
//! a smooth bump with a single peak, optionally with ripple or a narrow
//! correlated ridge.

use crate::Strategy;
use ndarray::Array1;
use std::collections::HashMap;

/// Test function type definition
pub type TestFunction = fn(&Array1<f64>) -> f64;

/// Negated squared distance to (0.5, ..., 0.5). Peak value 0.
pub fn paraboloid(x: &Array1<f64>) -> f64 {
    -x.iter().map(|&xi| (xi - 0.5).powi(2)).sum::<f64>()
}

/// Gaussian spot of width 0.1 centred at (0.3, ..., 0.3). Peak value 1.
pub fn gaussian_spot(x: &Array1<f64>) -> f64 {
    let r2: f64 = x.iter().map(|&xi| (xi - 0.3).powi(2)).sum();
    (-r2 / (2.0 * 0.1 * 0.1)).exp()
}

/// [`paraboloid`] plus a deterministic high-frequency ripple of amplitude 1e-4.
pub fn noisy_paraboloid(x: &Array1<f64>) -> f64 {
    let phase: f64 = x
        .iter()
        .enumerate()
        .map(|(i, &xi)| xi * (997.0 + 31.0 * i as f64))
        .sum();
    paraboloid(x) + 1e-4 * phase.sin()
}

/// Spot at (0.6, ..., 0.6) that is wide along the diagonal and narrow across it.
pub fn ridge_spot(x: &Array1<f64>) -> f64 {
    let lead = x[0];
    let along = (lead - 0.6).powi(2) / 0.02;
    let across: f64 = x.iter().skip(1).map(|&xi| (xi - lead).powi(2)).sum::<f64>() / 0.002;
    (-(along + across)).exp()
}

/// Configuration for a benchmark run.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Descriptive name for the benchmark.
    pub name: String,
    /// Name of the test function.
    pub function_name: String,
    /// Variable bounds as (lower, upper) pairs.
    pub bounds: Vec<(f64, f64)>,
    /// Location of the peak.
    pub expected_optimum: Vec<f64>,
    /// Tolerance for solution position comparison.
    pub position_tolerance: f64,
    /// Generation limit.
    pub max_generations: usize,
    /// Population size.
    pub popsize: usize,
    /// Mutation strategy.
    pub strategy: Strategy,
    /// Mutation scale factor.
    pub mutation: f64,
    /// Crossover probability.
    pub recombination: f64,
    /// Convergence threshold.
    pub threshold: f64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

/// Function registry mapping names to function pointers.
pub struct FunctionRegistry {
    functions: HashMap<String, TestFunction>,
}

impl FunctionRegistry {
    /// Creates a registry holding every landscape of this module.
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        functions.insert("paraboloid".to_string(), paraboloid as TestFunction);
        functions.insert("gaussian_spot".to_string(), gaussian_spot as TestFunction);
        functions.insert(
            "noisy_paraboloid".to_string(),
            noisy_paraboloid as TestFunction,
        );
        functions.insert("ridge_spot".to_string(), ridge_spot as TestFunction);
        Self { functions }
    }

    /// Gets a test function by name.
    pub fn get(&self, name: &str) -> Option<TestFunction> {
        self.functions.get(name).copied()
    }

    /// Lists all available function names, sorted alphabetically.
    pub fn list_functions(&self) -> Vec<String> {
        let mut names: Vec<_> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns an iterator over all (name, function) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &TestFunction)> {
        self.functions.iter()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate all benchmark configurations
pub fn generate_benchmark_configs() -> Vec<BenchmarkConfig> {
    vec![
        BenchmarkConfig {
            name: "paraboloid_2d".to_string(),
            function_name: "paraboloid".to_string(),
            bounds: vec![(0.0, 1.0); 2],
            expected_optimum: vec![0.5; 2],
            position_tolerance: 0.05,
            max_generations: 100,
            popsize: 6,
            strategy: Strategy::Best1,
            mutation: 0.5,
            recombination: 0.8,
            threshold: -0.01,
            seed: 42,
        },
        BenchmarkConfig {
            name: "gaussian_spot_3d".to_string(),
            function_name: "gaussian_spot".to_string(),
            bounds: vec![(0.0, 1.0); 3],
            expected_optimum: vec![0.3; 3],
            position_tolerance: 0.05,
            max_generations: 100,
            popsize: 12,
            strategy: Strategy::CurrentToBest1,
            mutation: 0.5,
            recombination: 0.8,
            threshold: 0.9,
            seed: 7,
        },
        BenchmarkConfig {
            name: "noisy_paraboloid_2d".to_string(),
            function_name: "noisy_paraboloid".to_string(),
            bounds: vec![(0.0, 1.0); 2],
            expected_optimum: vec![0.5; 2],
            position_tolerance: 0.1,
            max_generations: 100,
            popsize: 8,
            strategy: Strategy::Rand1,
            mutation: 0.5,
            recombination: 0.8,
            threshold: -0.01,
            seed: 3,
        },
        BenchmarkConfig {
            name: "ridge_spot_2d".to_string(),
            function_name: "ridge_spot".to_string(),
            bounds: vec![(0.0, 1.0); 2],
            expected_optimum: vec![0.6; 2],
            position_tolerance: 0.1,
            max_generations: 100,
            popsize: 10,
            strategy: Strategy::Best2,
            mutation: 0.5,
            recombination: 0.9,
            threshold: 0.5,
            seed: 11,
        },
    ]
}
