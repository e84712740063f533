use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bhgrav::{generate_test_data, RunConfig};

/// Write a random, reproducible particle input file for the `bh` driver.
#[derive(Parser, Debug)]
#[command(name = "gen_data")]
struct Args {
    /// Output file
    output: PathBuf,

    /// Number of particles
    count: usize,

    #[arg(long, default_value_t = 0.0)]
    t_start: f64,

    #[arg(long, default_value_t = 1.0)]
    t_end: f64,

    #[arg(long, default_value_t = 0.01)]
    dt: f64,

    /// Seed for reproducible data
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = RunConfig {
        particle_count: args.count,
        t_start: args.t_start,
        t_end: args.t_end,
        dt: args.dt,
    };
    generate_test_data(&args.output, &config, args.seed)
        .with_context(|| format!("generating {}", args.output.display()))?;

    println!(
        "generated {} particles in {}",
        args.count,
        args.output.display()
    );
    Ok(())
}
