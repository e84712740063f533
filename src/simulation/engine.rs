//! Simulation facade.
//!
//! `Simulation` owns the octree (and its node arena), the force scratch
//! buffer and the latest statistics. The caller owns the particles and
//! lends the slice to `step()`, which runs the whole per-step pipeline:
//! bounds fit, tree build, mass aggregation, force evaluation, leapfrog
//! integration. Between steps the tree is cleared and the arena rewound,
//! so repeated stepping does not grow memory beyond the high-water mark.

use std::time::Instant;

use log::debug;

use crate::error::SimResult;
use crate::simulation::forces;
use crate::simulation::integrator;
use crate::simulation::octree::{self, Octree};
use crate::simulation::params::SimulationConfig;
use crate::simulation::states::{NVec3, Particle};
use crate::simulation::stats::StepStats;

pub struct Simulation {
    config: SimulationConfig,
    tree: Octree,
    force_buf: Vec<NVec3>,
    stats: StepStats,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        let tree = Octree::new(config.max_particles_per_leaf);
        Self {
            config,
            tree,
            force_buf: Vec::new(),
            stats: StepStats::default(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The tree built by the most recent `step()` (or `clear`ed).
    pub fn tree(&self) -> &Octree {
        &self.tree
    }

    /// Statistics of the most recent `step()`.
    pub fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Advance the system by one time step.
    ///
    /// The slice is borrowed for the duration of the call; positions,
    /// velocities and force accumulators are updated in place. Particle
    /// ids are restamped from slice order so the self-interaction skip
    /// works even for a caller-assembled slice.
    pub fn step(&mut self, particles: &mut [Particle]) -> SimResult<()> {
        let step_start = Instant::now();
        let mut stats = StepStats::default();

        for (i, p) in particles.iter_mut().enumerate() {
            p.id = i as u32;
        }

        let t = Instant::now();
        let (center, size) = octree::fit_bounds(particles);
        stats.time_bounds = t.elapsed().as_secs_f64();

        let t = Instant::now();
        self.tree.build_with_bounds(center, size, particles)?;
        stats.time_build = t.elapsed().as_secs_f64();

        let t = Instant::now();
        self.tree.aggregate_mass(particles);
        stats.time_aggregate = t.elapsed().as_secs_f64();

        let t = Instant::now();
        forces::reset_forces(particles);
        self.force_buf.resize(particles.len(), NVec3::zeros());
        let counts =
            forces::accumulate_forces(&self.tree, particles, &self.config, &mut self.force_buf);
        forces::apply_forces(particles, &self.force_buf);
        stats.time_force = t.elapsed().as_secs_f64();

        let t = Instant::now();
        integrator::leapfrog_step(particles, self.config.dt);
        stats.time_integrate = t.elapsed().as_secs_f64();

        stats.particle_cell_interactions = counts.particle_cell;
        stats.direct_force_count = counts.direct;
        stats.nodes_used = self.tree.arena().high_water();
        stats.nodes_available = self.tree.arena().capacity();
        stats.max_tree_depth = self.tree.max_depth();
        stats.colocated_overflows = self.tree.colocated_overflows();
        stats.time_total = step_start.elapsed().as_secs_f64();

        debug!("step: {}", stats.summary());
        self.stats = stats;
        Ok(())
    }

    /// Invalidate the tree and rewind the arena. The next `step()` or
    /// `build` starts from a clean slate without freeing slot memory.
    pub fn clear(&mut self) {
        self.tree.clear();
    }
}
