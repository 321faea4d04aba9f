//! # JSON argument loader
//!
//! `add`, `query` and `embed --file` take their payloads as paths to JSON files rather
//! than inline arguments, so callers can hand over page-sized content and long vectors
//! without fighting shell quoting. This module reads those files and checks the shapes
//! the callers rely on.

use serde_json::Value;
use std::{fs, path::Path};

use crate::error::CliError;

/// Read and parse the JSON document at `path`.
///
/// # Errors
/// - [`CliError::FileNotFound`] if nothing exists at `path`.
/// - [`CliError::InvalidJson`] if the file is not valid JSON.
/// - [`CliError::Io`] for other read failures.
pub fn load_json_from_file(path: &Path) -> Result<Value, CliError> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|source| CliError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Interpret a JSON value as an embedding: a non-empty array of numbers.
///
/// Every number must be finite once narrowed to `f32`.
pub fn parse_embedding(value: Value) -> Result<Vec<f32>, CliError> {
    let Value::Array(items) = value else {
        return Err(CliError::InvalidEmbedding);
    };
    if items.is_empty() {
        return Err(CliError::InvalidEmbedding);
    }

    items
        .iter()
        .map(|item| {
            item.as_f64()
                .map(|v| v as f32)
                .filter(|v| v.is_finite())
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(CliError::InvalidEmbedding)
}

/// Turn a JSON content payload into the document text that gets stored.
///
/// Strings are used as-is; any other value is stored as its compact JSON text.
pub fn content_to_document(value: Value) -> Result<String, CliError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Null => Err(CliError::InvalidContent),
        other => Ok(serde_json::to_string(&other)?),
    }
}
