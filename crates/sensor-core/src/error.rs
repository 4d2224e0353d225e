use std::path::PathBuf;
use thiserror::Error;

/// All run-fatal errors produced by the sensor KPI pipeline.
///
/// Per-row problems are not errors: they are reported as
/// [`RejectionReason`](crate::models::RejectionReason) and counted.
#[derive(Error, Debug)]
pub enum SensorError {
    /// The input file does not exist.
    #[error("Input file not found: {0}")]
    FileNotFound(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output file (or its temporary sibling) could not be written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited text could not be decoded or encoded.
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A JSON config file could not be parsed.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the sensor crates.
pub type Result<T> = std::result::Result<T, SensorError>;
