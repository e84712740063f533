//! Core state types for the N-body simulation.
//!
//! Defines the scalar-vector alias `NVec3` and the `Particle` record the
//! whole pipeline operates on. Particles are owned by the caller; the
//! engine borrows the slice for the duration of a step.

use nalgebra::Vector3;
pub type NVec3 = Vector3<f64>;

/// Spatial dimension of the simulation. Fixed by the octree geometry.
pub const NDIM: usize = 3;
/// Number of octants per node (2^NDIM).
pub const NSUB: usize = 1 << NDIM;

/// A point mass advanced by the simulation.
///
/// `f` is a force accumulator that is reset and refilled on every step.
/// `id` is the particle's index in the input sequence and stays stable
/// across steps; the force traversal uses it to skip self-interaction.
#[derive(Debug, Clone)]
pub struct Particle {
    pub m: f64,   // mass, strictly positive
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub f: NVec3, // force accumulator
    pub id: u32,
}

impl Particle {
    pub fn new(m: f64, x: NVec3, v: NVec3) -> Self {
        Self {
            m,
            x,
            v,
            f: NVec3::zeros(),
            id: 0,
        }
    }
}
