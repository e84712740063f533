pub mod benchmark;
pub mod configuration;
pub mod error;
pub mod io;
pub mod simulation;

pub use simulation::arena::{Node, NodeArena, NodeIndex, NodeKind};
pub use simulation::engine::Simulation;
pub use simulation::forces::{
    accumulate_forces, apply_forces, direct_forces, reset_forces, InteractionCounts,
};
pub use simulation::integrator::leapfrog_step;
pub use simulation::octree::{fit_bounds, octant_index, Octree};
pub use simulation::params::{SimulationConfig, DEFAULT_EPS2, DEFAULT_GRAVITY};
pub use simulation::states::{NVec3, Particle, NDIM, NSUB};
pub use simulation::stats::StepStats;

pub use configuration::config::ParametersConfig;

pub use error::{SimError, SimResult};

pub use io::files::{
    generate_test_data, read_particles, read_run_config, snapshot_path, write_forces_snapshot,
    write_positions_snapshot, RunConfig,
};

pub use benchmark::benchmark::{bench_gravity, bench_step_curve};
