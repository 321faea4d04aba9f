//! # Errors
//!
//! Every failure `docvec` can report. All of them are terminal: `main` prints the
//! `Display` text to stdout and exits with status 1.
//!
//! [`CliError`] is what the dispatcher returns; store failures are kept in their own
//! [`StoreError`] so [`crate::vector_store`] can be used without the CLI around it.

use std::error::Error;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// Wrong argument count, no action, or an unparsable option.
    /// Carries the usage line for the offending action.
    #[error("{0}")]
    Usage(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Embedding must be a list of floats.")]
    InvalidEmbedding,

    #[error("Content must be a string or a JSON value, got null.")]
    InvalidContent,

    /// The config file exists but could not be read or parsed.
    #[error("Failed to load configuration from {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn Error>,
    },

    #[error("Unable to determine config directory: {0}")]
    ConfigDir(#[source] Box<dyn Error>),

    /// `init` refused to clobber an existing config file.
    #[error("Configuration already exists at {} (use --force to overwrite)", .0.display())]
    ConfigExists(PathBuf),

    #[error("Failed to compute embedding: {0}")]
    Embedding(#[source] Box<dyn Error>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the persistent collection store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create store directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open store at {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("Store query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Embedding dimension {found} does not match collection dimensionality {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Failed to encode embedding: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Stored embedding for {id} is corrupt: {source}")]
    Decode {
        id: String,
        #[source]
        source: bincode::error::DecodeError,
    },

    /// Raised by the ANN index (`hora` reports failures as static strings).
    #[error("Vector index error: {0}")]
    Index(&'static str),
}
