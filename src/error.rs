//! Typed error values reported by the core.
//!
//! The core never prints; it returns these to the driver, which decides
//! what to show and which exit code to use.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Header fields out of range (N <= 0, t_end <= t_start, dt <= 0, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A particle record failed validation or could not be parsed.
    #[error("invalid particle {index}: {reason}")]
    InvalidParticle { index: usize, reason: String },

    /// A node had zero size during insertion. Indicates a bounds bug;
    /// not recoverable.
    #[error("node with zero size at level {level} during insertion")]
    InvalidGeometry { level: u32 },

    /// The node allocator refused to hand out another slot.
    #[error("node arena exhausted after {nodes} nodes")]
    ArenaExhausted { nodes: usize },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
