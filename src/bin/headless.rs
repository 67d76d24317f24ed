//! Runs a simulation without rendering and reports the energy drift.
//!
//! Usage: `headless [BODIES] [FRAMES] [adaptive|dense|direct]`

use std::{env, time::Instant};

use color_eyre::eyre::{bail, Result};
use log::info;
use octree_gravity::{BarnesHut, DenseBarnesHut, DirectSummation, Parameters, Simulation, Solver};
use rand::{rngs::StdRng, SeedableRng};

/// Frame time of a 60 Hz display.
const DT: f32 = 1. / 60.;

fn run<S: Solver>(params: Parameters, solver: S, frames: usize) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    let sim = Simulation::new(params, solver);
    #[cfg(feature = "rayon")]
    let sim = sim.rayon_iter();
    let mut sim = sim;
    sim.seed(&mut rng)?;

    let initial = sim.total_energy();
    let start = Instant::now();
    for frame in 1..=frames {
        sim.step(DT)?;
        if frame % 60 == 0 {
            let drift = (sim.total_energy() - initial) / initial.abs();
            info!("frame {frame}: energy drift {:.3}%", 100. * drift);
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        "{frames} frames of {} bodies in {elapsed:.2}s ({:.1} fps)",
        sim.bodies().len(),
        frames as f64 / elapsed
    );
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let bodies = args.next().map(|s| s.parse()).transpose()?.unwrap_or(1000);
    let frames = args.next().map(|s| s.parse()).transpose()?.unwrap_or(600);
    let params = Parameters::default().with_body_count(bodies);

    match args.next().as_deref().unwrap_or("adaptive") {
        "adaptive" => run(params, BarnesHut::new(), frames),
        "dense" => run(params, DenseBarnesHut::new(), frames),
        "direct" => run(params, DirectSummation::new(), frames),
        other => bail!("unknown solver {other:?}, expected adaptive, dense or direct"),
    }
}
