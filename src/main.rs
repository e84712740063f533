use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Parser;

use bhgrav::{
    read_particles, read_run_config, snapshot_path, write_forces_snapshot, ParametersConfig,
    Simulation, SimulationConfig,
};

#[derive(Parser, Debug)]
#[command(name = "bh", about = "Barnes-Hut N-body simulator")]
struct Args {
    /// Input file with particle data
    filename: PathBuf,

    /// Barnes-Hut opening angle (e.g. 0.5)
    theta: f64,

    /// Maximum particles in a leaf node (e.g. 10)
    particles_per_leaf: usize,

    /// YAML file overriding G, softening and snapshot cadence
    #[arg(long)]
    params: Option<PathBuf>,

    /// Run the built-in timing benchmarks instead of a simulation
    #[arg(long)]
    bench: bool,
}

fn main() {
    env_logger::init();

    // clap's own exit code for bad usage is 2, which belongs to config
    // failures here.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };
    process::exit(run(&args));
}

fn run(args: &Args) -> i32 {
    if args.bench {
        bhgrav::bench_gravity();
        bhgrav::bench_step_curve();
        return 0;
    }

    if args.theta <= 0.0 || args.particles_per_leaf == 0 {
        eprintln!("error: theta must be positive and particles_per_leaf at least 1");
        return 1;
    }

    let run_config = match read_run_config(&args.filename) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to read configuration: {e}");
            return 2;
        }
    };

    let overrides = match &args.params {
        Some(path) => match ParametersConfig::load(path) {
            Ok(overrides) => overrides,
            Err(e) => {
                eprintln!("error: failed to read parameters: {e}");
                return 2;
            }
        },
        None => ParametersConfig::default(),
    };

    let mut particles = match read_particles(&args.filename, &run_config) {
        Ok(particles) => particles,
        Err(e) => {
            eprintln!("error: failed to read particle data: {e}");
            return 3;
        }
    };

    let mut config = SimulationConfig::new(run_config.dt, args.theta, args.particles_per_leaf);
    overrides.apply(&mut config);

    println!("Barnes-Hut simulation for {} particles", particles.len());
    println!(
        "  time: {} -> {} (dt = {})",
        run_config.t_start, run_config.t_end, run_config.dt
    );
    println!(
        "  theta: {}, particles per leaf: {}",
        config.theta, config.max_particles_per_leaf
    );

    let mut sim = Simulation::new(config);

    let snapshots = overrides.snapshots.unwrap_or(10).max(1);
    let output_interval = (run_config.t_end - run_config.t_start) / snapshots as f64;
    let mut next_output = run_config.t_start + output_interval;
    let mut seq: u64 = 1;

    let mut t = run_config.t_start;
    let mut step: u64 = 0;
    let wall = Instant::now();

    while t < run_config.t_end {
        if let Err(e) = sim.step(&mut particles) {
            eprintln!("error: simulation failed: {e}");
            return 1;
        }
        t += run_config.dt;
        step += 1;

        let summary = sim.stats().summary();
        println!("step {step:4} | t = {t:.3} | {summary}");

        if t >= next_output {
            let path = snapshot_path(
                "snapFORCE",
                particles.len(),
                args.theta,
                args.particles_per_leaf,
                seq,
            );
            if let Err(e) = write_forces_snapshot(&particles, &summary, &path) {
                eprintln!("error: failed to write snapshot: {e}");
                return 1;
            }
            println!("wrote forces to {}", path.display());
            seq += 1;
            next_output += output_interval;
        }

        sim.clear();
    }

    let elapsed = wall.elapsed().as_secs_f64();
    println!(
        "done: {step} steps in {elapsed:.3} s ({:.6} s/step)",
        elapsed / step.max(1) as f64
    );
    0
}
