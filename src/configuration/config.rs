//! Optional run-parameter overrides loaded from YAML.
//!
//! The mandatory run inputs (particle file, opening angle, leaf
//! capacity) arrive on the command line; this file lets a run override
//! the ambient physical constants and the snapshot cadence without
//! recompiling.
//!
//! # YAML format
//! ```yaml
//! gravity: 1.0        # force-law constant G
//! eps2: 1.0e-10       # softening, squared
//! snapshots: 10       # forces snapshots per run
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::simulation::params::SimulationConfig;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ParametersConfig {
    pub gravity: Option<f64>,
    pub eps2: Option<f64>,
    /// Number of evenly spaced forces snapshots over the run.
    pub snapshots: Option<u32>,
}

impl ParametersConfig {
    pub fn load(path: &Path) -> SimResult<Self> {
        let file = File::open(path).map_err(|e| SimError::io(path, e))?;
        serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| SimError::InvalidConfig(e.to_string()))
    }

    /// Overlay the present fields onto `config`.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(gravity) = self.gravity {
            config.gravity = gravity;
        }
        if let Some(eps2) = self.eps2 {
            config.eps2 = eps2;
        }
    }
}
