//! Numerical and physical parameters for the simulation.
//!
//! `SimulationConfig` holds the per-run settings:
//! - integration step size `dt`,
//! - opening angle `theta` and leaf capacity for the tree,
//! - softening and gravitational constant (`eps2`, `gravity`).
//!
//! These are threaded through the engine explicitly rather than living
//! in process globals.

/// Default gravitational (or Coulomb) constant.
pub const DEFAULT_GRAVITY: f64 = 1.0;
/// Default softening, squared. Strictly positive so that aliased or
/// coincident positions never produce a singular interaction.
pub const DEFAULT_EPS2: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub dt: f64,                       // time step
    pub theta: f64,                    // opening angle
    pub max_particles_per_leaf: usize, // leaf bucket capacity, >= 1
    pub gravity: f64,                  // force-law constant G
    pub eps2: f64,                     // softening, squared
}

impl SimulationConfig {
    pub fn new(dt: f64, theta: f64, max_particles_per_leaf: usize) -> Self {
        Self {
            dt,
            theta,
            max_particles_per_leaf,
            gravity: DEFAULT_GRAVITY,
            eps2: DEFAULT_EPS2,
        }
    }
}
