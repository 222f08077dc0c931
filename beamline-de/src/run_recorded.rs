//! Recording wrapper for OMEA runs, for offline analysis

use crate::evaluator::Evaluator;
use crate::recorder::{OptimizationRecorder, RecordingEvaluator};
use crate::{Bounds, OmeaConfig, OmeaDE, OmeaReport};
use directories::ProjectDirs;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Get the records directory using the directories crate
fn get_records_dir() -> Result<PathBuf, String> {
    let proj_dirs = ProjectDirs::from("org", "beamline", "beamline-de")
        .ok_or("Failed to determine project directories")?;

    let records_dir = proj_dirs.cache_dir().join("records");
    std::fs::create_dir_all(&records_dir)
        .map_err(|e| format!("Failed to create records directory: {}", e))?;

    Ok(records_dir)
}

/// Run OMEA with every evaluation recorded to CSV.
///
/// Records go to `output_dir` when given, else to the user cache directory.
/// Returns the report and the path of the per-generation trace CSV.
pub fn run_recorded_omea<E>(
    run_name: &str,
    evaluator: E,
    bounds: Bounds,
    config: OmeaConfig,
    output_dir: Option<PathBuf>,
) -> Result<(OmeaReport, PathBuf), Box<dyn std::error::Error>>
where
    E: Evaluator,
{
    let records_dir = match output_dir {
        Some(dir) => dir,
        None => get_records_dir().map_err(|e| format!("Failed to get records directory: {}", e))?,
    };

    let recorder = Arc::new(OptimizationRecorder::with_output_dir(
        run_name,
        records_dir.clone(),
    ));
    let recorded = RecordingEvaluator::new(evaluator, Arc::clone(&recorder));

    let mut de = OmeaDE::with_bounds(&recorded, bounds);
    *de.config_mut() = config;
    let report = de.solve()?;

    let blocks = recorder.finalize()?;
    let trace_path = recorder.save_trace(&report.trace)?;
    info!(
        "recorded {} evaluation block(s) and trace {} under {}",
        blocks.len(),
        trace_path.display(),
        records_dir.display()
    );

    Ok((report, trace_path))
}
