//! Error types for dataset loading and progress-store application.
//!
//! The engine functions themselves are total: malformed graph data degrades
//! into under- or over-inclusion, never into an error. Only the I/O boundary
//! (loading JSON) and the external store boundary can fail.

use std::path::PathBuf;

/// Result type for quest graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur at the edges of the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The JSON input did not match the expected shape.
    #[error("Failed to parse quest data at '{path}': {message}")]
    Parse {
        /// JSON path of the offending value (e.g. `tasks[3].objectives`).
        path: String,
        /// Underlying deserializer message.
        message: String,
    },

    /// Reading a dataset file failed.
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external progress store rejected a state change.
    #[error("Progress store failed to apply {command}: {source}")]
    Store {
        /// Human-readable rendering of the command that failed.
        command: String,
        /// The store's own error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub(crate) fn parse(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        Self::Parse {
            path,
            message: err.into_inner().to_string(),
        }
    }
}
