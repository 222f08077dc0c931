use beamline_de::function_registry::gaussian_spot;
use beamline_de::{CallbackAction, Intermediate, OmeaConfig, Strategy, differential_evolution};
use ndarray::Array1;
use std::time::Instant;

fn main() {
    env_logger::init();

    // Beam spot in a 3D slit/focus space, peak intensity 1 at (0.3, 0.3, 0.3)
    let bounds = [(0.0, 1.0); 3];

    for parallel in [false, true] {
        let mut cfg = OmeaConfig::default();
        cfg.popsize = 12;
        cfg.strategy = Strategy::CurrentToBest1;
        cfg.mutation = 0.5;
        cfg.recombination = 0.8;
        cfg.threshold = 0.9;
        cfg.seed = Some(42);
        cfg.parallel.enabled = parallel;

        cfg.callback = Some(Box::new(|inter: &Intermediate<'_>| {
            eprintln!(
                "gen {:3}  best={:.6}  accepted={}  stagnation={}",
                inter.generation, inter.fun, inter.accepted, inter.stagnation
            );
            CallbackAction::Continue
        }));

        let start = Instant::now();
        let spot = |x: &Array1<f64>| gaussian_spot(x);
        let report = differential_evolution(&spot, &bounds, cfg).expect("optimization failed");

        println!(
            "parallel={} converged={} message=\"{}\"\nbest f={:.6}\nbest x={:?}\nevaluations={} in {:.3}s\n",
            parallel,
            report.converged(),
            report.message,
            report.fun,
            report.x.to_vec(),
            report.nfev,
            start.elapsed().as_secs_f64()
        );
    }
}
