//! Force evaluation over the aggregated octree.
//!
//! The hot path: for each particle, walk the tree top-down and decide per
//! node whether the opening criterion `size / r <= theta` lets the whole
//! cell stand in as a single monopole, or whether to descend. Leaves that
//! fail the criterion fall back to direct pairwise interactions.
//!
//! Forces are not symmetrised. Each particle's traversal is independent,
//! reads only immutable tree state and writes only its own output slot,
//! which is what lets the loop run as a plain parallel for-each without
//! locks. The price is twice the pair work of a symmetric scheme.
//!
//! `direct_forces` is the exact O(N^2) reference summation, kept for
//! accuracy tests and benchmarks.

use rayon::prelude::*;

use crate::simulation::arena::{Node, NodeKind};
use crate::simulation::octree::Octree;
use crate::simulation::params::SimulationConfig;
use crate::simulation::states::{NVec3, Particle};

/// Interaction tallies for one force evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionCounts {
    /// Cells accepted by the opening criterion and applied as monopoles.
    pub particle_cell: u64,
    /// Direct particle pairs evaluated (self pairs are skipped, not
    /// counted).
    pub direct: u64,
}

impl std::ops::Add for InteractionCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            particle_cell: self.particle_cell + rhs.particle_cell,
            direct: self.direct + rhs.direct,
        }
    }
}

/// Zero every particle's force accumulator.
pub fn reset_forces(particles: &mut [Particle]) {
    particles.par_iter_mut().for_each(|p| p.f = NVec3::zeros());
}

/// Evaluate Barnes-Hut forces for every particle into `out`.
///
/// `out[i]` is overwritten with the total force on `particles[i]`. The
/// tree must have been built and aggregated over the same slice. Work is
/// parallel over particles; traversal cost varies strongly with local
/// density, so rayon's work stealing does the balancing.
pub fn accumulate_forces(
    tree: &Octree,
    particles: &[Particle],
    config: &SimulationConfig,
    out: &mut [NVec3],
) -> InteractionCounts {
    debug_assert_eq!(particles.len(), out.len());

    let Some(root) = tree.root() else {
        out.fill(NVec3::zeros());
        return InteractionCounts::default();
    };

    particles
        .par_iter()
        .zip(out.par_iter_mut())
        .map(|(p, acc)| {
            *acc = NVec3::zeros();
            let mut counts = InteractionCounts::default();
            for ci in root.children.iter().flatten() {
                let child = tree.arena().node(*ci);
                if child.kind != NodeKind::Empty {
                    interact(tree, particles, p, child, config, acc, &mut counts);
                }
            }
            counts
        })
        .reduce(InteractionCounts::default, |a, b| a + b)
}

/// Store evaluated forces back on the particles.
pub fn apply_forces(particles: &mut [Particle], forces: &[NVec3]) {
    particles
        .par_iter_mut()
        .zip(forces.par_iter())
        .for_each(|(p, f)| p.f = *f);
}

fn interact(
    tree: &Octree,
    particles: &[Particle],
    p: &Particle,
    node: &Node,
    config: &SimulationConfig,
    acc: &mut NVec3,
    counts: &mut InteractionCounts,
) {
    let r_vec = p.x - node.mass_center;
    let r2 = r_vec.norm_squared();
    let r = (r2 + config.eps2).sqrt();

    // Equality counts as well separated; regressions depend on it.
    if node.size / r <= config.theta {
        let r_cubed = (r2 + config.eps2) * r;
        *acc += -config.gravity * p.m * node.mass / r_cubed * r_vec;
        counts.particle_cell += 1;
    } else if node.kind == NodeKind::Internal {
        for ci in node.children.iter().flatten() {
            let child = tree.arena().node(*ci);
            if child.kind != NodeKind::Empty {
                interact(tree, particles, p, child, config, acc, counts);
            }
        }
    } else {
        for &q in &node.bucket {
            let other = &particles[q as usize];
            if other.id == p.id {
                continue;
            }
            direct_pair(p, other, config, acc);
            counts.direct += 1;
        }
    }
}

#[inline]
fn direct_pair(p: &Particle, q: &Particle, config: &SimulationConfig, acc: &mut NVec3) {
    let r_vec = p.x - q.x;
    let r2 = r_vec.norm_squared();
    let r_cubed = (r2 + config.eps2) * (r2 + config.eps2).sqrt();
    *acc += -config.gravity * p.m * q.m / r_cubed * r_vec;
}

/// Exact pairwise summation over every unordered pair, written into
/// `out`. Reference path for tests and benchmarks.
pub fn direct_forces(particles: &[Particle], config: &SimulationConfig, out: &mut [NVec3]) {
    debug_assert_eq!(particles.len(), out.len());
    for a in out.iter_mut() {
        *a = NVec3::zeros();
    }

    let n = particles.len();
    for i in 0..n {
        let (xi, mi) = (particles[i].x, particles[i].m);
        for j in (i + 1)..n {
            let (xj, mj) = (particles[j].x, particles[j].m);

            let r_vec = xi - xj;
            let r2 = r_vec.norm_squared();
            let r_cubed = (r2 + config.eps2) * (r2 + config.eps2).sqrt();
            let coef = config.gravity * mi * mj / r_cubed;

            // equal and opposite
            out[i] += -coef * r_vec;
            out[j] += coef * r_vec;
        }
    }
}
