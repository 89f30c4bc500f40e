//! Error types for the restoration pipeline and its analysis stages.

use thiserror::Error;

/// Failures reported at configuration or analysis boundaries.
///
/// None of these are fatal: the caller keeps its previous state and carries on.
#[derive(Error, Debug)]
pub enum PhonoError {
    /// Sample rate outside the supported table
    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    /// Detector or declicker configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// LPC order outside 1..=32
    #[error("Invalid LPC order: {0} (expected 1..={max})", max = crate::dsp::lpc::LPC_MAX_ORDER)]
    InvalidOrder(usize),

    /// Analysis window shorter than order + 1
    #[error("Analysis window too short: need {needed} samples, got {got}")]
    WindowTooShort { needed: usize, got: usize },

    /// Autocorrelation r[0] <= 0
    #[error("Analysis window has zero energy")]
    ZeroEnergy,

    /// Levinson-Durbin lost positive definiteness at the given step
    #[error("LPC recursion unstable at step {0}")]
    Unstable(usize),

    /// Settings file could not be read or written
    #[error("Settings I/O error: {0}")]
    SettingsIo(#[from] std::io::Error),

    /// Settings file is not valid JSON for the settings schema
    #[error("Settings parse error: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type PhonoResult<T> = Result<T, PhonoError>;
