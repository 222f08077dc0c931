use beamline_de::{
    Coupling, DerivedParams, DriverLink, EvalError, Evaluator, OmeaConfigBuilder, OmeaDE,
    Strategy,
};
use ndarray::{Array1, array};
use std::sync::Mutex;

/// Toy beamline: a slit of width `x[0]` (mm) and a vertically deflecting
/// mirror at grazing angle `x[1]` (mrad).
///
/// The mirror normal must be pushed before each propagation; the figure of
/// merit is the flux at the watchpoint, which drops when the normal is off.
struct Beamline {
    mirror: Mutex<DerivedParams>,
    settings: [f64; 2],
}

impl Evaluator for Beamline {
    fn evaluate(&self, x: &Array1<f64>) -> Result<f64, EvalError> {
        let normal = *self
            .mirror
            .lock()
            .map_err(|_| EvalError::Failed("mirror state poisoned".into()))?;
        let flux = 1.0 - (-x[0] / 0.2).exp();
        let spot = (-(x[1] - 6.0).powi(2) / 2.0).exp();
        // a tilted normal steers the beam off the watchpoint
        let misalignment = (normal.normal_vector_z + (x[1] / 1000.0).sin()).abs();
        Ok(flux * spot * (-1e6 * misalignment).exp() - 0.5 * x[0].powi(2))
    }

    fn push_derived(&self, optic: &str, params: &DerivedParams) -> Result<(), EvalError> {
        println!("  {optic}: {params}");
        let mut mirror = self
            .mirror
            .lock()
            .map_err(|_| EvalError::Failed("mirror state poisoned".into()))?;
        *mirror = *params;
        Ok(())
    }

    fn current(&self, dim: usize) -> Option<f64> {
        self.settings.get(dim).copied()
    }
}

fn main() {
    env_logger::init();

    let beamline = Beamline {
        mirror: Mutex::new(DerivedParams::from_grazing_angle(3.0, Coupling::Vertical)),
        settings: [0.1, 3.0],
    };

    let config = OmeaConfigBuilder::new()
        .popsize(8)
        .strategy(Strategy::CurrentToBest1)
        .mutation(0.5)
        .recombination(0.8)
        .threshold(0.7)
        .link(DriverLink::new(1, "VFM", Coupling::Vertical))
        .seed(5)
        .build()
        .expect("valid configuration");

    let mut de = OmeaDE::new(&beamline, array![0.01, 1.0], array![1.0, 10.0])
        .expect("valid bounds");
    *de.config_mut() = config;
    let report = de.solve().expect("optimization failed");

    println!("{:?}", report);
    println!(
        "slit={:.3} mm  angle={:.3} mrad  flux={:.4}",
        report.x[0], report.x[1], report.fun
    );
    println!(
        "final mirror vectors: {}",
        DerivedParams::from_grazing_angle(report.x[1], Coupling::Vertical)
    );
}
