use crate::driver_link::DerivedParams;
use crate::error::EvalError;
use crate::evaluator::Evaluator;
use crate::GenerationRecord;
use log::warn;
use ndarray::Array1;
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Evaluations buffered in memory before a CSV block is written.
const BLOCK_SIZE: usize = 10_000;

/// Records every evaluation of a run, in blocks of CSV files.
#[derive(Debug)]
pub struct OptimizationRecorder {
    /// Run name (used for CSV filenames)
    run_name: String,
    /// Output directory for CSV files
    output_dir: PathBuf,
    state: Mutex<RecorderState>,
    /// Generation that new records are tagged with
    current_generation: AtomicUsize,
}

#[derive(Debug, Default)]
struct RecorderState {
    pending: Vec<EvaluationRecord>,
    best: Option<f64>,
    evaluations: usize,
    failures: usize,
    blocks: usize,
}

/// A single evaluation record
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    /// Evaluation number (1-based)
    pub eval_id: usize,
    /// Generation number; 0 is the initial refinement pass, and the
    /// refinement and diversity evaluations after generation g count under g
    pub generation: usize,
    /// Input parameters x
    pub x: Vec<f64>,
    /// Fitness, or `None` when the evaluation failed
    pub fitness: Option<f64>,
    /// Highest fitness seen so far
    pub best_so_far: f64,
    /// Whether this evaluation raised the best fitness
    pub is_improvement: bool,
}

impl OptimizationRecorder {
    /// Create a recorder writing under `./data_generated/records`
    pub fn new(run_name: impl Into<String>) -> Self {
        Self::with_output_dir(run_name, "./data_generated/records")
    }

    /// Create a recorder with a custom output directory
    pub fn with_output_dir(run_name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_name: run_name.into(),
            output_dir: output_dir.into(),
            state: Mutex::new(RecorderState::default()),
            current_generation: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, RecorderState> {
        // a panicking evaluator must not lose the records gathered so far
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one evaluation outcome
    pub fn record_evaluation(&self, x: &Array1<f64>, result: &Result<f64, EvalError>) {
        let generation = self.current_generation.load(Ordering::Relaxed);
        let mut state = self.state();
        state.evaluations += 1;
        let eval_id = state.evaluations;

        let fitness = match result {
            Ok(f) if !f.is_nan() => Some(*f),
            _ => {
                state.failures += 1;
                None
            }
        };
        let is_improvement = match (fitness, state.best) {
            (Some(f), Some(best)) => f > best,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if is_improvement {
            state.best = fitness;
        }
        let best_so_far = state.best.unwrap_or(f64::NEG_INFINITY);

        state.pending.push(EvaluationRecord {
            eval_id,
            generation,
            x: x.to_vec(),
            fitness,
            best_so_far,
            is_improvement,
        });

        if state.pending.len() >= BLOCK_SIZE {
            let block = std::mem::take(&mut state.pending);
            state.blocks += 1;
            let block_id = state.blocks;
            drop(state);
            if let Err(e) = self.save_block_to_csv(&block, block_id) {
                warn!("failed to save evaluation block {}: {}", block_id, e);
            }
        }
    }

    /// Set the generation later records are tagged with
    pub fn set_generation(&self, generation: usize) {
        self.current_generation.store(generation, Ordering::Relaxed);
    }

    fn block_path(&self, block_id: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_block_{:04}.csv", self.run_name, block_id))
    }

    fn save_block_to_csv(
        &self,
        records: &[EvaluationRecord],
        block_id: usize,
    ) -> Result<(), Box<dyn std::error::Error>> {
        create_dir_all(&self.output_dir)?;
        let mut file = BufWriter::new(File::create(self.block_path(block_id))?);

        if records.is_empty() {
            return Ok(());
        }

        let num_dimensions = records[0].x.len();
        write!(file, "eval_id,generation,")?;
        for i in 0..num_dimensions {
            write!(file, "x{},", i)?;
        }
        writeln!(file, "fitness,best_so_far,is_improvement")?;

        for record in records {
            write!(file, "{},{},", record.eval_id, record.generation)?;
            for &xi in &record.x {
                write!(file, "{:.16},", xi)?;
            }
            match record.fitness {
                Some(f) => write!(file, "{:.16},", f)?,
                None => write!(file, "failed,")?,
            }
            writeln!(file, "{:.16},{}", record.best_so_far, record.is_improvement)?;
        }

        file.flush()?;
        Ok(())
    }

    /// Write the per-generation trace as `<run>_trace.csv`
    pub fn save_trace(
        &self,
        trace: &[GenerationRecord],
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}_trace.csv", self.run_name));
        let mut file = BufWriter::new(File::create(&path)?);

        let dims = trace.first().map_or(0, |r| r.best_x.len());
        write!(file, "generation,best_f,stagnation,accepted,nfev")?;
        for i in 0..dims {
            write!(file, ",x{}", i)?;
        }
        writeln!(file)?;
        for r in trace {
            write!(
                file,
                "{},{:.16},{},{},{}",
                r.generation, r.best_f, r.stagnation, r.accepted, r.nfev
            )?;
            for xi in &r.best_x {
                write!(file, ",{:.16}", xi)?;
            }
            writeln!(file)?;
        }
        file.flush()?;
        Ok(path)
    }

    /// Save any remaining records plus a summary; returns all block files
    pub fn finalize(&self) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut state = self.state();
        if !state.pending.is_empty() {
            let block = std::mem::take(&mut state.pending);
            state.blocks += 1;
            let block_id = state.blocks;
            drop(state);
            self.save_block_to_csv(&block, block_id)?;
        } else {
            drop(state);
        }

        self.save_summary()?;

        let total_blocks = self.state().blocks;
        Ok((1..=total_blocks).map(|id| self.block_path(id)).collect())
    }

    fn save_summary(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = self
            .output_dir
            .join(format!("{}_summary.txt", self.run_name));
        let mut file = File::create(&path)?;
        let (evaluations, best, blocks) = self.get_stats();
        let failures = self.state().failures;

        writeln!(file, "Run: {}", self.run_name)?;
        writeln!(file, "Total evaluations: {}", evaluations)?;
        writeln!(file, "Failed evaluations: {}", failures)?;
        writeln!(file, "Total blocks: {}", blocks)?;
        writeln!(file, "Best fitness found: {:?}", best)?;
        writeln!(file, "Block files:")?;
        for block_id in 1..=blocks {
            writeln!(file, "  {}_block_{:04}.csv", self.run_name, block_id)?;
        }
        Ok(())
    }

    /// (evaluations, best fitness, blocks written)
    pub fn get_stats(&self) -> (usize, Option<f64>, usize) {
        let state = self.state();
        (state.evaluations, state.best, state.blocks)
    }

    /// Records not yet written to disk
    pub fn pending_records(&self) -> Vec<EvaluationRecord> {
        self.state().pending.clone()
    }
}

/// Evaluator wrapper that records every call in an [`OptimizationRecorder`].
pub struct RecordingEvaluator<E> {
    inner: E,
    recorder: Arc<OptimizationRecorder>,
}

impl<E> RecordingEvaluator<E> {
    /// Wraps `inner`; outcomes go to `recorder`.
    pub fn new(inner: E, recorder: Arc<OptimizationRecorder>) -> Self {
        Self { inner, recorder }
    }

    /// The shared recorder.
    pub fn recorder(&self) -> &Arc<OptimizationRecorder> {
        &self.recorder
    }
}

impl<E: Evaluator> Evaluator for RecordingEvaluator<E> {
    fn evaluate(&self, x: &Array1<f64>) -> Result<f64, EvalError> {
        let result = self.inner.evaluate(x);
        self.recorder.record_evaluation(x, &result);
        result
    }

    fn push_derived(&self, optic: &str, params: &DerivedParams) -> Result<(), EvalError> {
        self.inner.push_derived(optic, params)
    }

    fn current(&self, dim: usize) -> Option<f64> {
        self.inner.current(dim)
    }

    fn begin_generation(&self, generation: usize) {
        self.recorder.set_generation(generation);
        self.inner.begin_generation(generation);
    }
}
