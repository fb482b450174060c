//! Error types for the tuner core.
//!
//! "No pitch right now" is never an error: the estimator, gate and smoother
//! return `None` for silence, noise and out-of-range input. The variants here
//! cover catalog and configuration faults only.

use thiserror::Error;

/// Faults in the tuning catalog or host configuration.
#[derive(Debug, Error)]
pub enum TunerError {
    /// A tuning definition without strings reached target selection.
    #[error("tuning '{id}' has no strings")]
    EmptyTuning { id: String },

    /// A tuning id that is not in the catalog.
    #[error("unknown tuning id: {0}")]
    UnknownTuning(String),

    /// An instrument name that is not in the catalog.
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    /// A configuration value outside its usable range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TunerError>;
