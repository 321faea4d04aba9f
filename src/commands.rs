//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available actions and their arguments.
//!
//! clap's own error reporting (usage text on stderr, exit status 2) is replaced by
//! [`parse`], which maps every parse failure onto a [`CliError`]: an unknown action
//! becomes [`CliError::UnknownAction`] and anything else becomes
//! [`CliError::Usage`] carrying the usage line of the action that was attempted.
//!
//! # Examples
//!
//! ```
//! use docvec::commands::{parse, Commands, Parsed};
//!
//! let Ok(Parsed::Command(cli)) = parse(["docvec", "query", "embedding.json"]) else {
//!     panic!("expected a command");
//! };
//! assert!(matches!(cli.command, Commands::Query { .. }));
//! ```

use clap::error::{ContextKind, ErrorKind};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::CliError;

/// Usage line printed when no action is given.
pub const GENERAL_USAGE: &str = "Usage: docvec <embed|add|query|list|init> <args>";

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Configuration file to load instead of the per-platform default.
    #[arg(long, global = true, env = "DOCVEC_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Collection to operate on, overriding the configured one.
    #[arg(long, global = true, env = "DOCVEC_COLLECTION", value_name = "NAME")]
    pub collection: Option<String>,

    /// The action to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available actions and their arguments.
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Print the embedding of some text as a JSON array.
    Embed {
        /// Text to embed; multiple words are joined with spaces.
        #[arg(
            required_unless_present = "file",
            conflicts_with = "file",
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        text: Vec<String>,

        /// Embed the JSON content stored in this file instead.
        #[arg(long, short = 'f', value_name = "CONTENT_JSON_FILE")]
        file: Option<PathBuf>,
    },

    /// Store a document and its embedding in the collection.
    Add {
        /// Identifier of the document, usually its source URL.
        url: String,
        /// JSON file holding the document content.
        content_file: PathBuf,
        /// JSON file holding the embedding (a list of floats).
        embedding_file: PathBuf,
    },

    /// Print the documents nearest to an embedding.
    Query {
        /// JSON file holding the query embedding (a list of floats).
        embedding_file: PathBuf,

        /// How many results to return (defaults to the configured `n_results`).
        #[arg(long, short = 'n', value_name = "COUNT")]
        n_results: Option<usize>,
    },

    /// Print every stored document id with a snippet of its content.
    List,

    /// Write a default configuration file.
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },
}

/// Action names, used to pick the usage line after a failed parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Embed,
    Add,
    Query,
    List,
    Init,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Embed,
        Action::Add,
        Action::Query,
        Action::List,
        Action::Init,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Embed => "embed",
            Action::Add => "add",
            Action::Query => "query",
            Action::List => "list",
            Action::Init => "init",
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            Action::Embed => "Usage: docvec embed <text...> | docvec embed --file <content-json-file>",
            Action::Add => "Usage: docvec add <url> <content-json-file> <embedding-json-file>",
            Action::Query => "Usage: docvec query <embedding-json-file> [-n <count>]",
            Action::List => "Usage: docvec list",
            Action::Init => "Usage: docvec init [--force]",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

/// Outcome of a successful [`parse`].
#[derive(Debug)]
pub enum Parsed {
    /// An action to run.
    Command(Cli),
    /// `--help` or `--version` output to print as-is.
    Info(String),
}

/// Parse `args` (including the program name) into a [`Cli`].
pub fn parse<I, T>(args: I) -> Result<Parsed, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    match Cli::try_parse_from(&args) {
        Ok(cli) => Ok(Parsed::Command(cli)),
        Err(err) => classify(err, &args),
    }
}

fn classify(err: clap::Error, args: &[OsString]) -> Result<Parsed, CliError> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Ok(Parsed::Info(err.to_string())),
        ErrorKind::InvalidSubcommand => {
            let name = err
                .get(ContextKind::InvalidSubcommand)
                .map(|value| value.to_string())
                .or_else(|| first_positional(args))
                .unwrap_or_default();
            Err(CliError::UnknownAction(name))
        }
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            if attempted_action(args).is_none() =>
        {
            Err(CliError::Usage(GENERAL_USAGE.to_string()))
        }
        _ => {
            let usage = attempted_action(args).map_or(GENERAL_USAGE, Action::usage);
            Err(CliError::Usage(usage.to_string()))
        }
    }
}

/// The first argument after the program name that names an action.
fn attempted_action(args: &[OsString]) -> Option<Action> {
    args.iter()
        .skip(1)
        .find_map(|arg| arg.to_str().and_then(Action::from_name))
}

fn first_positional(args: &[OsString]) -> Option<String> {
    args.iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy())
        .find(|arg| !arg.starts_with('-'))
        .map(|arg| arg.into_owned())
}
