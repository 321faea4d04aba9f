//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `DocvecConfig` struct, which holds the configuration parameters,
//! a `load_config` function to load the configuration from a YAML file, and
//! [`resolve`] which picks the file to load (or falls back to defaults).
//!
//! Every field has a default, so a config file only needs the keys it changes:
//!
//! ```yaml
//! db_path: "/var/lib/docvec"
//! n_results: 5
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use docvec::config::load_config;
//!
//! let config = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use tracing::*;

use crate::error::CliError;

/// Default location of the persistent collection, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "./docvec_db";

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "my_collection";

/// Sentence-embedding model fetched from the Hugging Face Hub.
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Which ANN index `query` builds over the stored embeddings.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact scan over every stored vector.
    #[default]
    BruteForce,
    /// Approximate HNSW graph.
    Hnsw,
}

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct DocvecConfig {
    /// Directory holding the collection database.
    pub db_path: PathBuf,

    /// Collection that `add`, `query` and `list` operate on.
    pub collection: String,

    /// Hugging Face model repository used by `embed`.
    pub model_id: String,

    /// Model revision (branch, tag or commit).
    pub model_revision: String,

    /// Number of neighbors `query` returns.
    pub n_results: usize,

    /// Characters of content shown per document by `list`.
    pub snippet_chars: usize,

    pub index: IndexKind,
}

impl Default for DocvecConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            collection: DEFAULT_COLLECTION.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_revision: "main".to_string(),
            n_results: 2,
            snippet_chars: 100,
            index: IndexKind::default(),
        }
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its YAML does not describe a
/// `DocvecConfig`.
pub fn load_config(file: impl AsRef<Path>) -> Result<DocvecConfig, Box<dyn Error>> {
    let file = file.as_ref();
    debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: DocvecConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Default path of the config file: `<config_dir>/config.yaml`.
pub fn default_config_path() -> Result<PathBuf, Box<dyn Error>> {
    Ok(crate::config_dir()?.join("config.yaml"))
}

/// Pick and load the effective configuration.
///
/// An explicit path (from `--config` or `DOCVEC_CONFIG`) must exist. Without one the
/// per-platform config file is used if present, otherwise the built-in defaults.
pub fn resolve(explicit: Option<&Path>) -> Result<DocvecConfig, CliError> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(CliError::FileNotFound(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Ok(path) if path.is_file() => path,
            Ok(_) => {
                debug!("No config file found, using defaults");
                return Ok(DocvecConfig::default());
            }
            Err(err) => {
                warn!("Unable to determine config directory ({err}), using defaults");
                return Ok(DocvecConfig::default());
            }
        },
    };

    load_config(&path).map_err(|source| CliError::Config { path, source })
}

/// Write the default configuration as YAML to `path`, creating parent directories.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_default_config(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        info!("Creating config directory: {}", parent.display());
        fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(&DocvecConfig::default()).map_err(|e| CliError::Config {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    info!("Creating config file: {}", path.display());
    fs::write(path, yaml)?;
    Ok(())
}
