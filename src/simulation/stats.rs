//! Per-step measurements.
//!
//! One `StepStats` snapshot is produced by every step: wall-clock
//! seconds per phase, interaction tallies from the force traversal, and
//! tree/arena gauges. The `summary()` string doubles as the header line
//! of snapshot files.

#[derive(Debug, Clone, Default)]
pub struct StepStats {
    pub time_bounds: f64,
    pub time_build: f64,
    pub time_aggregate: f64,
    pub time_force: f64,
    pub time_integrate: f64,
    pub time_total: f64,

    pub particle_cell_interactions: u64,
    pub direct_force_count: u64,

    /// Arena slots issued by the last build.
    pub nodes_used: usize,
    /// Arena slots in existence, issued or not.
    pub nodes_available: usize,
    pub max_tree_depth: u32,
    /// Leaf splits aborted because the occupants share a position.
    pub colocated_overflows: u64,
}

impl StepStats {
    /// Render as `key=value` pairs, `; `-joined.
    pub fn summary(&self) -> String {
        format!(
            "direct_force={}; particle_cell={}; nodes_used={}; nodes_available={}; \
             max_depth={}; colocated_overflows={}; time_bounds={:.6}; time_build={:.6}; \
             time_aggregate={:.6}; time_force={:.6}; time_integrate={:.6}; time_total={:.6}",
            self.direct_force_count,
            self.particle_cell_interactions,
            self.nodes_used,
            self.nodes_available,
            self.max_tree_depth,
            self.colocated_overflows,
            self.time_bounds,
            self.time_build,
            self.time_aggregate,
            self.time_force,
            self.time_integrate,
            self.time_total,
        )
    }
}
