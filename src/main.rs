//! Main module for the docvec CLI application.
//!
//! Installs the tracing subscriber, hands the command line to [`docvec::run`] and turns
//! any error into a message on stdout and exit status 1.
//!
//! # Examples
//!
//! ```sh
//! docvec embed "What is the meaning of life?" > embedding.json
//! echo '"The answer is 42."' > content.json
//! docvec add https://example.com/answer content.json embedding.json
//! docvec query embedding.json
//! docvec list
//! ```
//!
//! Logs go to stderr and are quiet by default; set `RUST_LOG=docvec=debug` to see them.

use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match docvec::run(std::env::args_os(), &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("Exiting with error: {:?}", err);
            let _ = writeln!(out, "{err}");
            ExitCode::FAILURE
        }
    }
}
