//! Hand-rolled timing comparisons of direct summation against the tree.
//!
//! Output is plain text on stdout; `bench_step_curve` prints CSV that
//! can be pasted straight into a spreadsheet.

use std::time::Instant;

use crate::simulation::engine::Simulation;
use crate::simulation::forces;
use crate::simulation::integrator;
use crate::simulation::octree::Octree;
use crate::simulation::params::SimulationConfig;
use crate::simulation::states::{NVec3, Particle};

/// Deterministic synthetic cloud, no rng needed.
fn make_particles(n: usize) -> Vec<Particle> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            let x = NVec3::new(
                (i_f * 0.37).sin() * 5.0,
                (i_f * 0.13).cos() * 5.0,
                (i_f * 0.07).sin() * 5.0,
            );
            let mut p = Particle::new(1.0, x, NVec3::zeros());
            p.id = i as u32;
            p
        })
        .collect()
}

fn make_config() -> SimulationConfig {
    let mut config = SimulationConfig::new(0.001, 0.7, 8);
    config.gravity = 0.1;
    config.eps2 = 1e-4;
    config
}

/// One full step on the direct O(N^2) path, for comparison against the
/// tree-based `Simulation::step`.
fn direct_step(particles: &mut [Particle], config: &SimulationConfig, out: &mut [NVec3]) {
    forces::reset_forces(particles);
    forces::direct_forces(particles, config, out);
    forces::apply_forces(particles, out);
    integrator::leapfrog_step(particles, config.dt);
}

/// Time a single force evaluation, direct vs tree, over a range of N.
pub fn bench_gravity() {
    let ns = [200, 400, 800, 1600, 3200, 6400];
    let config = make_config();

    for n in ns {
        let particles = make_particles(n);
        let mut out = vec![NVec3::zeros(); n];

        let mut tree = Octree::new(config.max_particles_per_leaf);

        // Warm up both paths once so allocation noise drops out.
        forces::direct_forces(&particles, &config, &mut out);
        tree.build(&particles).unwrap();
        tree.aggregate_mass(&particles);
        forces::accumulate_forces(&tree, &particles, &config, &mut out);

        let t0 = Instant::now();
        forces::direct_forces(&particles, &config, &mut out);
        let dt_direct = t0.elapsed().as_secs_f64();

        let t1 = Instant::now();
        tree.build(&particles).unwrap();
        tree.aggregate_mass(&particles);
        forces::accumulate_forces(&tree, &particles, &config, &mut out);
        let dt_bh = t1.elapsed().as_secs_f64();

        println!("N = {n:5}, direct = {dt_direct:8.6} s, BH = {dt_bh:8.6} s");
    }
}

/// Per-step cost of direct vs Barnes-Hut over a sweep of N, as CSV.
pub fn bench_step_curve() {
    println!("N,direct_ms,bh_ms");

    for n in (200..=12800).step_by(200) {
        // Small n: average a few steps to smooth noise. Large n: one
        // step keeps the sweep from taking minutes.
        let steps_direct: usize = if n <= 800 { 5 } else { 1 };
        let steps_bh: usize = if n <= 2000 { 3 } else { 1 };

        let template = make_particles(n);
        let config = make_config();

        let mut particles = template.clone();
        let mut out = vec![NVec3::zeros(); n];
        let t0 = Instant::now();
        for _ in 0..steps_direct {
            direct_step(&mut particles, &config, &mut out);
        }
        let ms_direct = t0.elapsed().as_secs_f64() * 1000.0 / steps_direct as f64;

        let mut particles = template.clone();
        let mut sim = Simulation::new(config);
        let t1 = Instant::now();
        for _ in 0..steps_bh {
            sim.step(&mut particles).unwrap();
        }
        let ms_bh = t1.elapsed().as_secs_f64() * 1000.0 / steps_bh as f64;

        println!("{n},{ms_direct:.6},{ms_bh:.6}");
    }
}
