//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a trace or walking its tables
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed trace: {0}")]
    Malformed(String),

    #[error("Unsupported trace version {found} (expected {expected})")]
    UnsupportedVersion { found: i32, expected: i32 },

    #[error("Invalid {table} index {index} (table has {len} entries)")]
    InvalidIndex {
        table: &'static str,
        index: i64,
        len: usize,
    },

    #[error("Corrupted trace data: {0}")]
    DataCorruption(String),
}

impl TraceError {
    pub(crate) fn invalid_index(table: &'static str, index: impl Into<i64>, len: usize) -> Self {
        TraceError::InvalidIndex {
            table,
            index: index.into(),
            len,
        }
    }
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("Flamegraph rendering failed: {0}")]
    RenderFailed(String),

    #[error("Flamegraph output is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
