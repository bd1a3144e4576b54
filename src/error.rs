//! Construction-time errors
//!
//! Runtime per-source problems never surface here; they degrade into the
//! verdict instead.

use thiserror::Error;

use crate::types::SourceId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid threshold {0}: must be a finite value greater than 0")]
    InvalidThreshold(f64),

    #[error("Invalid per-source timeout: must be greater than 0")]
    InvalidTimeout,

    #[error("Invalid quorum {0}: at least 1 successful source is required")]
    InvalidQuorum(usize),

    #[error("No price sources configured")]
    NoSources,

    #[error("Quorum of {min_quorum} can never be met with {sources} configured sources")]
    QuorumExceedsSources { min_quorum: usize, sources: usize },

    #[error("Duplicate source id: {0}")]
    DuplicateSource(SourceId),
}
