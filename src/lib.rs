//! # docvec (library root)
//!
//! This crate provides the plumbing for the **docvec** CLI: compute sentence
//! embeddings and keep them, with the documents they came from, in a persistent
//! vector collection that can be queried for nearest neighbors.
//!
//! - Command-line parsing and usage errors (`commands`).
//! - Configuration (`config`).
//! - Sentence embeddings with Candle (`embeddings`).
//! - JSON payload loading and validation (`loader`).
//! - The SQLite-backed collection store and ANN search (`vector_store`, `models`, `schema`).
//! - Output rendering (`output`).
//!
//! ## Actions
//!
//! ```text
//! docvec embed <text...>                                   # JSON array of floats
//! docvec embed --file <content-json-file>
//! docvec add <url> <content-json-file> <embedding-json-file>   # {"status":"success"}
//! docvec query <embedding-json-file> [-n <count>]          # [{id, document, distance}, ...]
//! docvec list                                              # count + id/snippet lines
//! docvec init [--force]                                    # write a default config file
//! ```
//!
//! Every failure is reported on stdout and ends the process with status 1.
//!
//! ## Model loading
//! Only `embed` needs the embedding model. It is loaded on first use through
//! [`embeddings::LazyEmbedder`], so the store actions start without paying for it.
//!
//! ## Modules
//! - [`commands`], [`config`], [`embeddings`], [`error`], [`loader`], [`models`],
//!   [`output`], [`schema`], [`vector_store`]

use directories::ProjectDirs;
use std::error::Error;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod loader;
pub mod models;
pub mod output;
pub mod schema;
pub mod vector_store;

use commands::{Commands, Parsed};
use config::DocvecConfig;
use embeddings::{Embedder, LazyEmbedder};
use error::CliError;
use vector_store::VectorStore;

/// Return the per-platform configuration directory used by docvec.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "docvec", "docvec")`, e.g. `~/.config/docvec` on Linux.
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined.
pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "docvec", "docvec")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Parse `args` (including the program name), run the requested action and write its
/// output to `out`.
///
/// # Errors
/// Any [`CliError`]; the caller reports it and exits with status 1.
pub fn run<I, T, W>(args: I, out: &mut W) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
{
    let cli = match commands::parse(args)? {
        Parsed::Info(text) => {
            write!(out, "{text}")?;
            return Ok(());
        }
        Parsed::Command(cli) => cli,
    };
    debug!("Parsed command line: {:?}", cli);

    let mut config = match cli.command {
        Commands::Init { .. } => DocvecConfig::default(),
        _ => config::resolve(cli.config.as_deref())?,
    };
    if let Some(collection) = cli.collection {
        config.collection = collection;
    }

    let embedder = LazyEmbedder::new(config.model_id.clone(), config.model_revision.clone());
    execute(cli.command, cli.config.as_deref(), &config, &embedder, out)
}

/// Run one parsed action against `config`.
///
/// `embedder` is only consulted by [`Commands::Embed`]. `config_path` is where `init`
/// writes; without it the per-platform default is used.
pub fn execute<E, W>(
    command: Commands,
    config_path: Option<&Path>,
    config: &DocvecConfig,
    embedder: &E,
    out: &mut W,
) -> Result<(), CliError>
where
    E: Embedder + ?Sized,
    W: Write,
{
    match command {
        Commands::Embed { text, file } => {
            let text = match file {
                Some(path) => loader::content_to_document(loader::load_json_from_file(&path)?)?,
                None => text.join(" "),
            };
            debug!("Embedding {} characters", text.chars().count());
            let embedding = embedder.embed(&text).map_err(CliError::Embedding)?;
            output::write_embedding(out, &embedding)?;
        }
        Commands::Add {
            url,
            content_file,
            embedding_file,
        } => {
            let content = loader::load_json_from_file(&content_file)?;
            let embedding = loader::load_json_from_file(&embedding_file)?;
            let embedding = loader::parse_embedding(embedding)?;
            let content = loader::content_to_document(content)?;

            let mut store = open_store(config)?;
            store.add(&url, &content, &embedding)?;
            output::write_status(out)?;
        }
        Commands::Query {
            embedding_file,
            n_results,
        } => {
            let embedding = loader::load_json_from_file(&embedding_file)?;
            let embedding = loader::parse_embedding(embedding)?;

            let mut store = open_store(config)?;
            let hits = store.query(&embedding, n_results.unwrap_or(config.n_results))?;
            output::write_query_results(out, &hits)?;
        }
        Commands::List => {
            let mut store = open_store(config)?;
            let documents = store.list()?;
            output::write_listing(out, &documents, config.snippet_chars)?;
        }
        Commands::Init { force } => {
            let path = match config_path {
                Some(path) => path.to_path_buf(),
                None => config::default_config_path().map_err(CliError::ConfigDir)?,
            };
            config::write_default_config(&path, force)?;
            writeln!(out, "Wrote default configuration to {}", path.display())?;
        }
    }

    Ok(())
}

fn open_store(config: &DocvecConfig) -> Result<VectorStore, CliError> {
    Ok(VectorStore::open(
        &config.db_path,
        &config.collection,
        config.index,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    /// Deterministic stand-in for the sentence model; counts how often it is asked.
    struct CountingEmbedder {
        calls: Cell<usize>,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
            }
        }
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error>> {
            self.calls.set(self.calls.get() + 1);
            let len = text.chars().count() as f32;
            let norm = (len * len + 1.0).sqrt();
            Ok(vec![len / norm, 1.0 / norm])
        }
    }

    fn test_config(dir: &TempDir) -> DocvecConfig {
        DocvecConfig {
            db_path: dir.path().join("db"),
            ..DocvecConfig::default()
        }
    }

    fn exec(
        command: Commands,
        config: &DocvecConfig,
        embedder: &CountingEmbedder,
    ) -> Result<String, CliError> {
        let mut out = Vec::new();
        execute(command, None, config, embedder, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn write_json(dir: &TempDir, name: &str, json: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_embed_joins_words() {
        let dir = tempdir().unwrap();
        let embedder = CountingEmbedder::new();
        let text = exec(
            Commands::Embed {
                text: vec!["ab".into(), "c".into()],
                file: None,
            },
            &test_config(&dir),
            &embedder,
        )
        .unwrap();

        let embedding: Vec<f32> = serde_json::from_str(&text).unwrap();
        let expected = embedder.embed("ab c").unwrap();
        assert_eq!(embedding, expected);
    }

    #[test]
    fn test_embed_from_file() {
        let dir = tempdir().unwrap();
        let embedder = CountingEmbedder::new();
        let content = write_json(&dir, "content.json", r#""four""#);
        let text = exec(
            Commands::Embed {
                text: vec![],
                file: Some(content),
            },
            &test_config(&dir),
            &embedder,
        )
        .unwrap();

        let embedding: Vec<f32> = serde_json::from_str(&text).unwrap();
        assert_eq!(embedding, embedder.embed("four").unwrap());
    }

    #[test]
    fn test_store_actions_never_embed() {
        let dir = tempdir().unwrap();
        let config = test_config(&dir);
        let embedder = CountingEmbedder::new();
        let content = write_json(&dir, "content.json", r#"{"title": "Example"}"#);
        let embedding = write_json(&dir, "embedding.json", "[0.6, 0.8]");

        let added = exec(
            Commands::Add {
                url: "https://example.com".into(),
                content_file: content,
                embedding_file: embedding.clone(),
            },
            &config,
            &embedder,
        )
        .unwrap();
        assert_eq!(added, "{\"status\":\"success\"}\n");

        let listed = exec(Commands::List, &config, &embedder).unwrap();
        assert!(listed.starts_with("Total documents in collection: 1\n"));
        assert!(listed.contains("1. ID: https://example.com\n"));
        assert!(listed.contains(r#"Snippet: {"title":"Example"}..."#));

        let queried = exec(
            Commands::Query {
                embedding_file: embedding,
                n_results: None,
            },
            &config,
            &embedder,
        )
        .unwrap();
        let hits: serde_json::Value = serde_json::from_str(&queried).unwrap();
        assert_eq!(hits[0]["id"], "https://example.com");
        assert_eq!(hits[0]["distance"], 0.0);

        assert_eq!(embedder.calls.get(), 0);
    }

    #[test]
    fn test_add_validates_before_touching_the_store() {
        let dir = tempdir().unwrap();
        let config = test_config(&dir);
        let embedder = CountingEmbedder::new();
        let content = write_json(&dir, "content.json", r#""text""#);
        let not_a_list = write_json(&dir, "embedding.json", r#"{"values": [0.1]}"#);

        let err = exec(
            Commands::Add {
                url: "u".into(),
                content_file: content.clone(),
                embedding_file: not_a_list,
            },
            &config,
            &embedder,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Embedding must be a list of floats.");

        let missing = dir.path().join("missing.json");
        let err = exec(
            Commands::Add {
                url: "u".into(),
                content_file: content,
                embedding_file: missing.clone(),
            },
            &config,
            &embedder,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("File not found: {}", missing.display())
        );
        assert!(!config.db_path.exists());
    }

    #[test]
    fn test_query_result_count() {
        let dir = tempdir().unwrap();
        let config = test_config(&dir);
        let embedder = CountingEmbedder::new();
        let content = write_json(&dir, "content.json", r#""text""#);
        for (i, vector) in ["[1, 0]", "[0.8, 0.6]", "[0, 1]"].iter().enumerate() {
            let embedding = write_json(&dir, &format!("e{i}.json"), vector);
            exec(
                Commands::Add {
                    url: format!("doc-{i}"),
                    content_file: content.clone(),
                    embedding_file: embedding,
                },
                &config,
                &embedder,
            )
            .unwrap();
        }
        let query = write_json(&dir, "query.json", "[1, 0]");

        let default_count: Vec<serde_json::Value> = serde_json::from_str(
            &exec(
                Commands::Query {
                    embedding_file: query.clone(),
                    n_results: None,
                },
                &config,
                &embedder,
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(default_count.len(), 2);
        assert_eq!(default_count[0]["id"], "doc-0");
        assert_eq!(default_count[1]["id"], "doc-1");

        let all: Vec<serde_json::Value> = serde_json::from_str(
            &exec(
                Commands::Query {
                    embedding_file: query,
                    n_results: Some(10),
                },
                &config,
                &embedder,
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2]["id"], "doc-2");
    }

    #[test]
    fn test_init_writes_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut out = Vec::new();

        execute(
            Commands::Init { force: false },
            Some(&path),
            &DocvecConfig::default(),
            &CountingEmbedder::new(),
            &mut out,
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("Wrote default configuration to {}\n", path.display())
        );
        assert_eq!(config::load_config(&path).unwrap(), DocvecConfig::default());
    }

    #[test]
    fn test_run_reports_usage_errors() {
        let mut out = Vec::new();
        let err = run(["docvec", "query"], &mut out).unwrap_err();
        assert!(err.to_string().contains("query"));

        let err = run(["docvec", "nope"], &mut out).unwrap_err();
        assert_eq!(err.to_string(), "Unknown action: nope");
        assert!(out.is_empty());
    }
}
