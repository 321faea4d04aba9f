//! # Output rendering
//!
//! Everything docvec prints on stdout for a successful action. JSON outputs are meant to
//! be consumed by other programs; the listing is meant for people.
//!
//! All functions write to any [`Write`] so tests and the binary share one code path.

use serde_json::json;
use std::io::{self, Write};

use crate::vector_store::{ListedDocument, QueryHit};

/// Print an embedding as a single-line JSON array.
pub fn write_embedding<W: Write>(out: &mut W, embedding: &[f32]) -> io::Result<()> {
    serde_json::to_writer(&mut *out, embedding)?;
    writeln!(out)
}

/// Print the acknowledgement for a successful `add`.
pub fn write_status<W: Write>(out: &mut W) -> io::Result<()> {
    serde_json::to_writer(&mut *out, &json!({ "status": "success" }))?;
    writeln!(out)
}

/// Print query hits as a pretty JSON array (two-space indent, UTF-8 left as-is).
pub fn write_query_results<W: Write>(out: &mut W, hits: &[QueryHit]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, hits)?;
    writeln!(out)
}

/// Print the document count followed by one numbered entry per document.
///
/// ```text
/// Total documents in collection: 1
/// 1. ID: https://example.com
///    Snippet: Example Domain...
///
/// ```
pub fn write_listing<W: Write>(
    out: &mut W,
    documents: &[ListedDocument],
    snippet_chars: usize,
) -> io::Result<()> {
    writeln!(out, "Total documents in collection: {}", documents.len())?;
    for (i, document) in documents.iter().enumerate() {
        writeln!(out, "{}. ID: {}", i + 1, document.id)?;
        writeln!(
            out,
            "   Snippet: {}...\n",
            snippet(&document.content, snippet_chars)
        )?;
    }
    Ok(())
}

/// The first `max_chars` characters of `text`.
pub fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
