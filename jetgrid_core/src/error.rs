use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenError {
    #[error("configuration error: {0}")]
    Config(String),
    /// Corrupted pipeline (valve count mismatch, sentinel collision, ...).
    #[error("internal invariant violated: {0}")]
    Invariant(String),
    #[error("malformed frame data: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("device rejected upload: {0}")]
    Device(String),
    #[error("timeout waiting for device")]
    Timeout,
    #[error("upload aborted")]
    Aborted,
    #[error("valve {valve} holds a state for {run} frames, below the minimum of {min}")]
    RunTooShort { valve: usize, run: usize, min: usize },
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing noise field A")]
    MissingFieldA,
    #[error("missing threshold policy (set bw_threshold or target_transparency)")]
    MissingThreshold,
    #[error("conflicting threshold policy (bw_threshold and target_transparency both set)")]
    ConflictingThreshold,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
