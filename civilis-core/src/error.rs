//! Error types for the Civilis core library.

use thiserror::Error;

use crate::types::AgentId;

/// Top-level error type for all Civilis operations.
#[derive(Error, Debug)]
pub enum CivilisError {
    /// Configuration values are out of range or unsupported.
    ///
    /// Always raised before any agent or network state is created.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedding provider could not produce a vector.
    ///
    /// There is no fallback embedding strategy, so this aborts the run.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// An agent identifier is not part of the population.
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    /// The simulation was driven from a state that does not allow it.
    #[error("Invalid simulation state: expected {expected}, found {actual}")]
    InvalidState {
        /// State required by the operation.
        expected: &'static str,
        /// State the simulation was actually in.
        actual: &'static str,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, CivilisError>;
