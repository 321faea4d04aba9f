//! # VectorStore
//!
//! Persistent embedding collections for docvec.
//!
//! A store is a directory holding one SQLite database (`docvec.sqlite3`). Inside it,
//! documents are grouped into named collections; each document keeps the caller's id,
//! its text and its embedding. Nearest-neighbor queries load the collection's vectors
//! into an ANN index from the `hora` crate and rank them by Euclidean distance.
//!
//! ## Responsibilities
//! - **Persistence**: Diesel over SQLite; embeddings stored as `bincode` blobs.
//! - **Indexing**: exact brute-force scan or HNSW, picked by [`IndexKind`].
//! - **Consistency**: a collection adopts the dimensionality of its first vector and
//!   rejects mismatching adds and queries. Re-adding an id replaces the old record.
//!
//! ## Quick Example
//! ```no_run
//! use docvec::config::IndexKind;
//! use docvec::vector_store::VectorStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = VectorStore::open("./docvec_db".as_ref(), "pages", IndexKind::BruteForce)?;
//! store.add("https://example.com", "Example Domain", &[0.6, 0.8])?;
//! let hits = store.query(&[0.6, 0.8], 2)?;
//! assert_eq!(hits[0].id, "https://example.com");
//! # Ok(()) }
//! ```

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use hora::core::ann_index::ANNIndex;
use hora::core::metrics::Metric;
use hora::index::bruteforce_idx::BruteForceIndex;
use hora::index::bruteforce_params::BruteForceParams;
use hora::index::hnsw_idx::HNSWIndex;
use hora::index::hnsw_params::HNSWParams;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::IndexKind;
use crate::error::StoreError;
use crate::models::{Collection, Document};
use crate::schema::{collections, documents};

/// File name of the database inside the store directory.
pub const DB_FILE_NAME: &str = "docvec.sqlite3";

pub(crate) const CREATE_TABLES: &str = r#"
PRAGMA busy_timeout = 5000;
CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    dimension INTEGER
);
CREATE TABLE IF NOT EXISTS documents (
    seq_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    collection_id INTEGER NOT NULL REFERENCES collections (id),
    doc_id TEXT NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    UNIQUE (collection_id, doc_id)
);
"#;

/// Whether [`VectorStore::add`] created a record or overwrote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    Replaced,
}

/// One nearest-neighbor result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
}

/// A stored document without its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedDocument {
    pub id: String,
    pub content: String,
}

/// Handle on one collection inside a store directory.
pub struct VectorStore {
    connection: SqliteConnection,
    collection: Collection,
    collection_id: i32,
    index_kind: IndexKind,
    db_file: PathBuf,
}

impl VectorStore {
    /// Open (creating if needed) the store under `db_dir` and the named collection in it.
    ///
    /// # Errors
    /// - [`StoreError::CreateDir`] if the directory cannot be created.
    /// - [`StoreError::Connection`] if SQLite cannot open the database file.
    /// - [`StoreError::Query`] if the schema cannot be created or read.
    pub fn open(
        db_dir: &Path,
        collection_name: &str,
        index_kind: IndexKind,
    ) -> Result<Self, StoreError> {
        fs::create_dir_all(db_dir).map_err(|source| StoreError::CreateDir {
            path: db_dir.to_path_buf(),
            source,
        })?;

        let db_file = db_dir.join(DB_FILE_NAME);
        let mut connection =
            SqliteConnection::establish(&db_file.to_string_lossy()).map_err(|source| {
                StoreError::Connection {
                    path: db_file.clone(),
                    source,
                }
            })?;
        connection.batch_execute(CREATE_TABLES)?;

        let collection = get_or_create_collection(&mut connection, collection_name)?;
        let collection_id = collection.id.ok_or(diesel::result::Error::NotFound)?;
        info!(
            "Opened collection {:?} (id {}) in {}",
            collection.name,
            collection_id,
            db_file.display()
        );

        Ok(Self {
            connection,
            collection,
            collection_id,
            index_kind,
            db_file,
        })
    }

    /// Name of the open collection.
    pub fn collection_name(&self) -> &str {
        &self.collection.name
    }

    /// Dimensionality of the collection's vectors, if any have been added.
    pub fn dimension(&self) -> Option<usize> {
        self.collection.dimension()
    }

    /// Path of the underlying database file.
    pub fn db_file(&self) -> &Path {
        &self.db_file
    }

    /// Insert a document, or replace the content and embedding of an existing id.
    ///
    /// The first add fixes the collection's dimensionality.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] if `embedding` does not match the collection;
    /// nothing is written in that case.
    pub fn add(
        &mut self,
        id: &str,
        content: &str,
        embedding: &[f32],
    ) -> Result<AddOutcome, StoreError> {
        let blob = bincode::serde::encode_to_vec(embedding, bincode::config::standard())?;
        let collection_id = self.collection_id;
        let found = embedding.len();

        let outcome = self.connection.immediate_transaction::<_, StoreError, _>(|conn| {
            let dimension: Option<i32> = collections::table
                .find(collection_id)
                .select(collections::dimension)
                .first(conn)?;

            match dimension {
                Some(expected) if expected as usize != found => {
                    return Err(StoreError::DimensionMismatch {
                        expected: expected as usize,
                        found,
                    });
                }
                Some(_) => {}
                None => {
                    debug!("Collection {} adopts dimension {}", collection_id, found);
                    diesel::update(collections::table.find(collection_id))
                        .set(collections::dimension.eq(Some(found as i32)))
                        .execute(conn)?;
                }
            }

            let existing: Option<i32> = documents::table
                .filter(documents::collection_id.eq(collection_id))
                .filter(documents::doc_id.eq(id))
                .select(documents::seq_id)
                .first(conn)
                .optional()?;

            if let Some(seq_id) = existing {
                warn!("Document {} already exists, replacing it", id);
                diesel::update(documents::table.find(seq_id))
                    .set((
                        documents::content.eq(content),
                        documents::embedding.eq(blob.as_slice()),
                    ))
                    .execute(conn)?;
                return Ok(AddOutcome::Replaced);
            }

            let document = Document {
                seq_id: None,
                collection_id,
                doc_id: id.to_string(),
                content: content.to_string(),
                embedding: blob.clone(),
            };
            diesel::insert_into(documents::table)
                .values(&document)
                .execute(conn)?;
            Ok(AddOutcome::Inserted)
        })?;

        self.collection.dimension = Some(found as i32);
        info!("Added document {} ({:?})", id, outcome);
        Ok(outcome)
    }

    /// Return up to `n_results` documents nearest to `embedding`, nearest first.
    ///
    /// An empty collection yields an empty result.
    ///
    /// # Errors
    /// [`StoreError::DimensionMismatch`] if `embedding` does not match the collection.
    pub fn query(
        &mut self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryHit>, StoreError> {
        self.refresh_collection()?;
        let Some(expected) = self.dimension() else {
            debug!("Collection {} is empty", self.collection.name);
            return Ok(Vec::new());
        };
        if expected != embedding.len() {
            return Err(StoreError::DimensionMismatch {
                expected,
                found: embedding.len(),
            });
        }

        let stored = self.load_documents()?;
        let k = n_results.min(stored.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let vectors: Vec<Vec<f32>> = stored.iter().map(|(_, v)| v.clone()).collect();
        debug!(
            "Searching {} vectors with {:?} for {} neighbors",
            vectors.len(),
            self.index_kind,
            k
        );
        let positions = match self.index_kind {
            IndexKind::BruteForce => nearest(
                BruteForceIndex::<f32, usize>::new(expected, &BruteForceParams::default()),
                &vectors,
                embedding,
                k,
            )?,
            IndexKind::Hnsw => nearest(
                HNSWIndex::<f32, usize>::new(expected, &HNSWParams::default()),
                &vectors,
                embedding,
                k,
            )?,
        };

        let mut hits: Vec<QueryHit> = positions
            .into_iter()
            .filter_map(|position| stored.get(position))
            .map(|(document, vector)| QueryHit {
                id: document.doc_id.clone(),
                document: document.content.clone(),
                distance: squared_euclidean_distance(embedding, vector),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.dedup_by(|a, b| a.id == b.id);
        hits.truncate(k);
        Ok(hits)
    }

    /// Every document in the collection, in insertion order, without embeddings.
    pub fn list(&mut self) -> Result<Vec<ListedDocument>, StoreError> {
        let rows: Vec<(String, String)> = documents::table
            .filter(documents::collection_id.eq(self.collection_id))
            .order(documents::seq_id.asc())
            .select((documents::doc_id, documents::content))
            .load(&mut self.connection)?;

        Ok(rows
            .into_iter()
            .map(|(id, content)| ListedDocument { id, content })
            .collect())
    }

    /// Number of documents in the collection.
    pub fn count(&mut self) -> Result<usize, StoreError> {
        let count: i64 = documents::table
            .filter(documents::collection_id.eq(self.collection_id))
            .count()
            .get_result(&mut self.connection)?;
        Ok(count as usize)
    }

    /// Re-read the collection row; another process may have set its dimension.
    fn refresh_collection(&mut self) -> Result<(), StoreError> {
        self.collection = collections::table
            .find(self.collection_id)
            .select(Collection::as_select())
            .first(&mut self.connection)?;
        Ok(())
    }

    fn load_documents(&mut self) -> Result<Vec<(Document, Vec<f32>)>, StoreError> {
        let documents: Vec<Document> = documents::table
            .filter(documents::collection_id.eq(self.collection_id))
            .order(documents::seq_id.asc())
            .select(Document::as_select())
            .load(&mut self.connection)?;

        documents
            .into_iter()
            .map(|document| {
                let (vector, _): (Vec<f32>, usize) = bincode::serde::decode_from_slice(
                    &document.embedding,
                    bincode::config::standard(),
                )
                .map_err(|source| StoreError::Decode {
                    id: document.doc_id.clone(),
                    source,
                })?;
                Ok((document, vector))
            })
            .collect()
    }
}

fn get_or_create_collection(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Collection, StoreError> {
    let new_collection = Collection {
        id: None,
        name: name.to_string(),
        dimension: None,
    };
    let created = diesel::insert_into(collections::table)
        .values(&new_collection)
        .on_conflict(collections::name)
        .do_nothing()
        .execute(conn)?;
    if created > 0 {
        info!("Created collection {:?}", name);
    }

    Ok(collections::table
        .filter(collections::name.eq(name))
        .select(Collection::as_select())
        .first(conn)?)
}

/// Load `vectors` into `index` (ids are their positions) and search it.
fn nearest<I: ANNIndex<f32, usize>>(
    mut index: I,
    vectors: &[Vec<f32>],
    query: &[f32],
    k: usize,
) -> Result<Vec<usize>, StoreError> {
    for (position, vector) in vectors.iter().enumerate() {
        index.add(vector, position).map_err(StoreError::Index)?;
    }
    index.build(Metric::Euclidean).map_err(StoreError::Index)?;
    Ok(index.search(query, k))
}

/// Squared Euclidean distance: `Σ (a[i] - b[i])^2`.
///
/// Extra elements of the longer slice are ignored; callers check lengths first.
pub fn squared_euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open(dir: &Path) -> VectorStore {
        VectorStore::open(dir, "test_collection", IndexKind::BruteForce).unwrap()
    }

    #[test]
    fn test_open_creates_store_directory() {
        let dir = tempdir().unwrap();
        let db_dir = dir.path().join("nested").join("db");

        let store = open(&db_dir);
        assert!(db_dir.join(DB_FILE_NAME).is_file());
        assert_eq!(store.db_file(), db_dir.join(DB_FILE_NAME));
        assert_eq!(store.collection_name(), "test_collection");
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn test_add_then_list() {
        let dir = tempdir().unwrap();
        let mut store = open(dir.path());

        let outcome = store
            .add("https://a.example", "Rust is cool.", &[1.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(outcome, AddOutcome::Inserted);
        store
            .add("https://b.example", "I love programming.", &[0.0, 1.0, 0.0])
            .unwrap();

        let listed = store.list().unwrap();
        assert_eq!(
            listed,
            vec![
                ListedDocument {
                    id: "https://a.example".into(),
                    content: "Rust is cool.".into()
                },
                ListedDocument {
                    id: "https://b.example".into(),
                    content: "I love programming.".into()
                },
            ]
        );
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn test_readding_an_id_replaces_it() {
        let dir = tempdir().unwrap();
        let mut store = open(dir.path());

        store.add("https://a.example", "old", &[1.0, 0.0]).unwrap();
        store.add("https://b.example", "other", &[0.0, 1.0]).unwrap();
        let outcome = store.add("https://a.example", "new", &[0.0, 1.0]).unwrap();
        assert_eq!(outcome, AddOutcome::Replaced);

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "https://a.example");
        assert_eq!(listed[0].content, "new");

        let hits = store.query(&[0.0, 1.0], 2).unwrap();
        assert!(hits.iter().all(|hit| hit.distance.abs() < 1e-6));
    }

    #[test]
    fn test_query_nearest_first() {
        let dir = tempdir().unwrap();
        let mut store = open(dir.path());

        store.add("far", "far away", &[0.0, 0.0, 1.0]).unwrap();
        store.add("exact", "exact match", &[0.6, 0.8, 0.0]).unwrap();
        store.add("near", "close by", &[0.8, 0.6, 0.0]).unwrap();

        let hits = store.query(&[0.6, 0.8, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "exact");
        assert_eq!(hits[0].document, "exact match");
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].id, "near");
        assert!((hits[1].distance - 0.08).abs() < 1e-5);

        let all = store.query(&[0.6, 0.8, 0.0], 10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id, "far");
        assert!(all.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_query_count_larger_than_collection() {
        let dir = tempdir().unwrap();
        let mut store = open(dir.path());
        store.add("far", "far away", &[0.0, 1.0]).unwrap();
        store.add("exact", "exact match", &[1.0, 0.0]).unwrap();

        let hits = store.query(&[1.0, 0.0], usize::MAX).unwrap();
        let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, ["exact", "far"]);

        let mut hnsw = VectorStore::open(dir.path(), "test_collection", IndexKind::Hnsw).unwrap();
        assert_eq!(hnsw.query(&[1.0, 0.0], usize::MAX).unwrap().len(), 2);
        assert!(store.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_open_shares_one_collection() {
        let dir = tempdir().unwrap();
        let db_dir = dir.path().to_path_buf();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db_dir = db_dir.clone();
                std::thread::spawn(move || {
                    VectorStore::open(&db_dir, "shared", IndexKind::BruteForce)
                        .map(|store| store.collection_id)
                        .map_err(|err| err.to_string())
                })
            })
            .collect();
        let ids: Vec<i32> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));

        let reopened = VectorStore::open(&db_dir, "shared", IndexKind::BruteForce).unwrap();
        assert_eq!(reopened.collection_id, ids[0]);
    }

    #[test]
    fn test_query_empty_collection() {
        let dir = tempdir().unwrap();
        let mut store = open(dir.path());

        assert!(store.query(&[0.1, 0.2], 2).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = open(dir.path());
        store.add("a", "first", &[1.0, 0.0, 0.0]).unwrap();

        let err = store.add("b", "second", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        ));
        assert_eq!(store.count().unwrap(), 1);

        let err = store.query(&[1.0, 0.0, 0.0, 0.0], 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Embedding dimension 4 does not match collection dimensionality 3"
        );
    }

    #[test]
    fn test_collections_are_isolated_and_persistent() {
        let dir = tempdir().unwrap();
        {
            let mut pages = open(dir.path());
            pages.add("a", "page", &[1.0, 0.0]).unwrap();
            let mut notes = VectorStore::open(dir.path(), "notes", IndexKind::BruteForce).unwrap();
            notes.add("b", "note", &[0.0, 1.0, 0.0, 0.0]).unwrap();
        }

        let mut pages = open(dir.path());
        assert_eq!(pages.dimension(), Some(2));
        let listed = pages.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "a");

        let mut notes = VectorStore::open(dir.path(), "notes", IndexKind::BruteForce).unwrap();
        assert_eq!(notes.dimension(), Some(4));
        assert_eq!(notes.count().unwrap(), 1);
    }

    #[test]
    fn test_hnsw_index_finds_exact_match() {
        let dir = tempdir().unwrap();
        let mut store = VectorStore::open(dir.path(), "hnsw", IndexKind::Hnsw).unwrap();
        for i in 0..20 {
            let angle = i as f32 * 0.15;
            store
                .add(&format!("doc-{i}"), "text", &[angle.cos(), angle.sin()])
                .unwrap();
        }

        let query = [(0.75f32).cos(), (0.75f32).sin()];
        let hits = store.query(&query, 2).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].id, "doc-5");
        assert!(hits[0].distance < 1e-6);
    }

    #[test]
    fn test_squared_euclidean_distance() {
        assert_eq!(squared_euclidean_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
        assert_eq!(squared_euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }
}
