//! # Database models
//!
//! Data structures that map to the collection store's SQLite schema via **Diesel**.
//!
//! - [`Collection`]: a named set of documents and the dimensionality its vectors share.
//! - [`Document`]: one stored record (caller id, content, encoded embedding).
//!
//! The tables themselves are declared in [`crate::schema`] and created by
//! [`crate::vector_store::VectorStore::open`].
use diesel::prelude::*;

/// A named collection of documents.
///
/// `dimension` stays `NULL` until the first document is added; after that every
/// embedding added to or queried against the collection must have that length.
#[derive(Queryable, Insertable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::collections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Collection {
    /// Auto-increment primary key (set by the DB on insert).
    #[diesel(deserialize_as = i32)]
    pub id: Option<i32>,
    /// Unique collection name.
    pub name: String,
    /// Length of the vectors stored in this collection, once known.
    pub dimension: Option<i32>,
}

impl Collection {
    /// The dimensionality as a `usize`, if the collection has any vectors yet.
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.map(|d| d as usize)
    }
}

/// One stored document.
///
/// `seq_id` doubles as the insertion order used by listings. `embedding` holds the
/// `bincode`-encoded `Vec<f32>`.
#[derive(Queryable, Insertable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Document {
    /// Auto-increment primary key (set by the DB on insert).
    #[diesel(deserialize_as = i32)]
    pub seq_id: Option<i32>,
    /// Foreign key to the owning [`Collection`].
    pub collection_id: i32,
    /// Caller-supplied identifier (usually the source URL).
    pub doc_id: String,
    /// Document text.
    pub content: String,
    /// Encoded embedding.
    pub embedding: Vec<u8>,
}
