//! Fixed-step time integration.
//!
//! Kick-drift-kick leapfrog over the particle slice, in place. Both
//! half-kicks use the force computed for the current step, which keeps
//! the scheme second order and symplectic for conservative forces.

use rayon::prelude::*;

use crate::simulation::states::Particle;

/// Advance every particle by `dt` using its accumulated force.
pub fn leapfrog_step(particles: &mut [Particle], dt: f64) {
    let half_dt = 0.5 * dt;
    particles.par_iter_mut().for_each(|p| {
        let a = p.f / p.m;

        // Kick: v += a * dt/2
        p.v += half_dt * a;
        // Drift: x += v * dt
        p.x += dt * p.v;
        // Kick: v += a * dt/2
        p.v += half_dt * a;
    });
}
