//! Error types for the mooflash CLI

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    /// Flash engine, kill switch or dispatcher failure
    #[error(transparent)]
    Core(#[from] mooflash_core::Error),

    /// Failed to read a file
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file did not parse
    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Image file is larger than the configured chip
    #[error("Image {path} is {actual} bytes, chip holds {expected}")]
    ImageSize {
        path: PathBuf,
        actual: usize,
        expected: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Sweep finished with mismatches
    #[error("Sweep found {0} mismatched bytes")]
    SweepMismatch(u32),
}

/// Result type for CLI commands
pub type Result<T> = std::result::Result<T, CliError>;
