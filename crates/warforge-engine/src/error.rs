//! Error types for the simulation engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and simulation execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: warforge_core::config::ConfigError,
    },

    /// The simulation run failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: warforge_core::runner::RunnerError,
    },

    /// Writing the JSON outcome file failed.
    #[error("report error: {message}")]
    Report {
        /// Description of the report failure.
        message: String,
    },
}
