use beamline_de::function_registry::{FunctionRegistry, TestFunction};
use beamline_de::{
    Bounds, CallbackAction, Evaluator, Intermediate, OmeaConfig, OmeaDE, OmeaReport,
    ParallelConfig, RunConfig, Strategy, TimeoutEvaluator, run_recorded_omea,
};
use clap::Parser;
use log::info;
use ndarray::Array1;
use std::fmt::Write as FmtWrite;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "run_omea",
    about = "Maximize a benchmark landscape with OMEA differential evolution"
)]
struct Cli {
    /// JSON run configuration; replaces the optimizer flags below
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the landscape to maximize (use --list-functions to see available options)
    #[arg(long)]
    function: Option<String>,

    /// Dimensionality of the problem; each dimension is searched in [0, 1]
    #[arg(long, default_value_t = 2)]
    dim: usize,

    /// Population size
    #[arg(long, default_value_t = 10)]
    popsize: usize,

    /// Mutation strategy (rand/1, best/1, current-to-best/1, best/2, rand/2)
    #[arg(long, default_value = "rand/1")]
    strategy: String,

    /// Mutation scale factor F
    #[arg(long = "mutation", default_value_t = 0.5)]
    f: f64,

    /// Crossover probability CR in [0, 1]
    #[arg(long = "recombination", default_value_t = 0.8)]
    cr: f64,

    /// Minimum best fitness before stagnation may stop the run
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    threshold: f64,

    /// Generation limit
    #[arg(long, default_value_t = 100)]
    max_generations: usize,

    /// Stagnant generations needed to converge
    #[arg(long, default_value_t = 5)]
    patience: usize,

    /// Optional random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Evaluate each generation's trial/target pairs in parallel
    #[arg(long)]
    parallel: bool,

    /// Number of threads for parallel evaluation (0 = use all available cores)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Per-evaluation timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Record every evaluation to CSV in the cache directory
    #[arg(long)]
    record: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print intermediate progress every N generations (>= 1)
    #[arg(long, default_value_t = 1)]
    progress_every: usize,

    /// Write the effective run configuration to this file and continue
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// List all available functions and exit
    #[arg(long)]
    list_functions: bool,
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    let registry = FunctionRegistry::new();

    if args.list_functions {
        list_available_functions(&registry);
        return;
    }

    let function_name = match &args.function {
        Some(name) => name.trim(),
        None => {
            eprintln!("Error: --function must be provided unless --list-functions is used.");
            process::exit(2);
        }
    };

    let (resolved_name, function) = match resolve_function(&registry, function_name) {
        Some(resolved) => resolved,
        None => {
            eprintln!(
                "Error: function '{function_name}' not found. Use --list-functions to inspect available names."
            );
            process::exit(2);
        }
    };

    if args.progress_every == 0 {
        eprintln!("Error: --progress-every must be at least 1.");
        process::exit(2);
    }

    let run_config = match &args.config {
        Some(path) => RunConfig::from_file(path).unwrap_or_else(|err| {
            eprintln!("Error: {err}");
            process::exit(2);
        }),
        None => run_config_from_flags(&args),
    };

    if let Some(path) = &args.save_config
        && let Err(err) = run_config.to_file(path)
    {
        eprintln!("Error: {err}");
        process::exit(2);
    }

    let bounds = run_config.bounds().unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        process::exit(2);
    });
    let mut config = run_config.to_config().unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        process::exit(2);
    });

    let overall_start = Instant::now();
    if !args.record && !args.json {
        config.callback = Some(progress_callback(args.progress_every));
    }

    println!(
        "Running OMEA on '{}' ({}D) with {} strategy...",
        resolved_name,
        bounds.len(),
        config.strategy
    );
    info!("effective configuration: {:?}", config);

    let result = match args.timeout_ms {
        Some(ms) => {
            let evaluator = TimeoutEvaluator::new(Arc::new(function), Duration::from_millis(ms));
            optimize(&resolved_name, evaluator, bounds, config, args.record)
        }
        None => optimize(&resolved_name, function, bounds, config, args.record),
    };

    let report = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: optimization failed: {}", e);
            process::exit(2);
        }
    };

    if args.json {
        print_json(&resolved_name, &report);
    } else {
        print_report(&report, overall_start.elapsed());
    }

    if !report.converged() {
        process::exit(1);
    }
}

fn run_config_from_flags(args: &Cli) -> RunConfig {
    let strategy = Strategy::from_str(&args.strategy).unwrap_or_else(|err| {
        eprintln!("Error parsing strategy '{}': {}", args.strategy, err);
        process::exit(2);
    });

    RunConfig {
        bounds: vec![[0.0, 1.0]; args.dim],
        popsize: args.popsize,
        cr: args.cr,
        f: args.f,
        threshold: args.threshold,
        strategy,
        max_generations: args.max_generations,
        patience: args.patience,
        decimals: 3,
        seed: args.seed,
        x0: None,
        retries: 1,
        inject_diversity: true,
        links: Vec::new(),
        parallel: ParallelConfig {
            enabled: args.parallel,
            num_threads: if args.threads == 0 {
                None
            } else {
                Some(args.threads)
            },
        },
    }
}

fn optimize<E: Evaluator>(
    name: &str,
    evaluator: E,
    bounds: Bounds,
    config: OmeaConfig,
    record: bool,
) -> Result<OmeaReport, Box<dyn std::error::Error>> {
    if record {
        let (report, trace_path) = run_recorded_omea(name, evaluator, bounds, config, None)?;
        println!("Trace written to {}", trace_path.display());
        return Ok(report);
    }
    let mut de = OmeaDE::with_bounds(&evaluator, bounds);
    *de.config_mut() = config;
    Ok(de.solve()?)
}

fn progress_callback(every: usize) -> Box<dyn FnMut(&Intermediate<'_>) -> CallbackAction> {
    Box::new(move |intermediate: &Intermediate<'_>| {
        if intermediate.generation == 1 || intermediate.generation % every == 0 {
            println!(
                "gen {:>4} | best = {:>12.6e} | accepted = {:>3} | stagnation = {}",
                intermediate.generation,
                intermediate.fun,
                intermediate.accepted,
                intermediate.stagnation
            );
            println!("           x = [{}]", format_vector(&intermediate.x));
        }
        CallbackAction::Continue
    })
}

fn format_vector(x: &Array1<f64>) -> String {
    let mut buffer = String::new();
    for (idx, value) in x.iter().enumerate() {
        if idx > 0 {
            buffer.push_str(", ");
        }
        let _ = write!(&mut buffer, "{value:.6}");
    }
    buffer
}

fn print_report(report: &OmeaReport, elapsed: Duration) {
    println!("\nOptimization completed in {:.2?}", elapsed);
    println!("Status: {}", report.message);
    println!(
        "Generations: {} | Evaluations: {} | Failed: {} | Converged: {}",
        report.generations,
        report.nfev,
        report.failed_evaluations,
        report.converged()
    );
    println!("Best fitness: {:.6e}", report.fun);
    println!("Best parameters: [{}]", format_vector(&report.x));
}

fn print_json(name: &str, report: &OmeaReport) {
    let value = serde_json::json!({
        "function": name,
        "x": report.x.to_vec(),
        "fun": report.fun,
        "termination": report.termination,
        "message": report.message,
        "generations": report.generations,
        "nfev": report.nfev,
        "failed_evaluations": report.failed_evaluations,
        "trace": report.trace,
    });
    match serde_json::to_string_pretty(&value) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Error: cannot serialize report: {e}");
            process::exit(2);
        }
    }
}

fn list_available_functions(registry: &FunctionRegistry) {
    let names = registry.list_functions();
    println!("Available test functions ({}):", names.len());
    for name in names {
        println!("- {name}");
    }
}

fn resolve_function(
    registry: &FunctionRegistry,
    requested: &str,
) -> Option<(String, TestFunction)> {
    if let Some(func) = registry.get(requested) {
        return Some((requested.to_string(), func));
    }

    let requested_lower = requested.to_lowercase();
    for name in registry.list_functions() {
        if name.to_lowercase() == requested_lower
            && let Some(func) = registry.get(&name)
        {
            return Some((name, func));
        }
    }
    None
}
