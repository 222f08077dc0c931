//! JSON configuration for optimization runs

use crate::driver_link::DriverLink;
use crate::parallel_eval::ParallelConfig;
use crate::{Bounds, OmeaConfig, Strategy};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete run configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// `[lower, upper]` pair per dimension
    pub bounds: Vec<[f64; 2]>,
    /// Population size
    #[serde(default = "default_popsize")]
    pub popsize: usize,
    /// Crossover probability
    #[serde(default = "default_cr")]
    pub cr: f64,
    /// Mutation scale factor
    #[serde(default = "default_f")]
    pub f: f64,
    /// Minimum best fitness before stagnation may stop the run
    #[serde(default)]
    pub threshold: f64,
    /// Mutation strategy
    #[serde(default)]
    pub strategy: Strategy,
    /// Generation limit
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stagnant generations needed to converge
    #[serde(default = "default_patience")]
    pub patience: usize,
    /// Decimal places of the stagnation comparison
    #[serde(default = "default_decimals")]
    pub decimals: i32,
    /// Random seed
    #[serde(default)]
    pub seed: Option<u64>,
    /// Explicit first individual
    #[serde(default)]
    pub x0: Option<Vec<f64>>,
    /// Retries per failed evaluation
    #[serde(default = "default_retries")]
    pub retries: usize,
    /// Replace the worst individual by a random sample each generation
    #[serde(default = "default_true")]
    pub inject_diversity: bool,
    /// Derived-parameter links
    #[serde(default)]
    pub links: Vec<DriverLink>,
    /// Parallel evaluation
    #[serde(default)]
    pub parallel: ParallelConfig,
}

fn default_popsize() -> usize {
    10
}
fn default_cr() -> f64 {
    0.8
}
fn default_f() -> f64 {
    0.5
}
fn default_max_generations() -> usize {
    100
}
fn default_patience() -> usize {
    5
}
fn default_decimals() -> i32 {
    3
}
fn default_retries() -> usize {
    1
}
fn default_true() -> bool {
    true
}

impl RunConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse JSON: {}", e))
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write config file: {}", e))
    }

    /// Validated search box
    pub fn bounds(&self) -> crate::Result<Bounds> {
        let pairs: Vec<(f64, f64)> = self.bounds.iter().map(|b| (b[0], b[1])).collect();
        Bounds::from_pairs(&pairs)
    }

    /// Optimizer configuration (no callback); validated against the bounds
    pub fn to_config(&self) -> crate::Result<OmeaConfig> {
        let config = OmeaConfig {
            popsize: self.popsize,
            recombination: self.cr,
            mutation: self.f,
            threshold: self.threshold,
            strategy: self.strategy,
            max_generations: self.max_generations,
            patience: self.patience,
            decimals: self.decimals,
            seed: self.seed,
            x0: self.x0.clone().map(Array1::from),
            links: self.links.clone(),
            retries: self.retries,
            inject_diversity: self.inject_diversity,
            callback: None,
            parallel: self.parallel.clone(),
        };
        config.validate_for(self.bounds.len())?;
        Ok(config)
    }
}
