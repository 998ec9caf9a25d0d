//! In-memory vector index with brute-force cosine search and durable snapshots.
//!
//! This module provides [`VectorIndex`], the single source of truth for chunk
//! records. State lives behind an `Arc<tokio::sync::RwLock<_>>`: inserts,
//! deletes, and saves take the write lock, searches share the read lock. The
//! CPU-bound parts (scoring every vector, serializing a snapshot) run on
//! tokio's blocking pool with an owned guard, so the async runtime is never
//! stalled and no reader can observe a half-applied mutation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::validate_retrieval;
use crate::document::{Chunk, IndexStats, ModelTag, SearchResult};
use crate::error::{RagError, Result};
use crate::persistence::{read_artifact, write_artifact};
use crate::similarity::{cosine_similarity, rank};
use crate::vectorstore::VectorStore;

/// Chunk records keyed by insertion sequence number.
///
/// The sequence number fixes the tie-break order for search and the record
/// order on disk.
#[derive(Debug)]
struct IndexState {
    tag: ModelTag,
    records: BTreeMap<u64, Chunk>,
    by_id: HashMap<String, u64>,
    by_document: HashMap<String, Vec<u64>>,
    next_seq: u64,
}

impl IndexState {
    fn new(tag: ModelTag) -> Self {
        Self {
            tag,
            records: BTreeMap::new(),
            by_id: HashMap::new(),
            by_document: HashMap::new(),
            next_seq: 0,
        }
    }

    fn from_chunks(tag: ModelTag, chunks: Vec<Chunk>) -> Result<Self> {
        let mut state = Self::new(tag);
        state.validate(&chunks)?;
        state.append(chunks);
        Ok(state)
    }

    /// Reject the whole batch if any chunk would break an index invariant.
    fn validate(&self, chunks: &[Chunk]) -> Result<()> {
        let mut batch_ids = HashSet::with_capacity(chunks.len());
        for chunk in chunks {
            if chunk.embedding.len() != self.tag.dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: self.tag.dimensions,
                    actual: chunk.embedding.len(),
                });
            }
            // JSON has no NaN or infinity; such a record could never be reloaded.
            if let Some(i) = chunk.embedding.iter().position(|v| !v.is_finite()) {
                return Err(RagError::InvalidEmbedding(format!(
                    "chunk '{}' has non-finite value at component {i}",
                    chunk.id
                )));
            }
            if self.by_id.contains_key(&chunk.id) || !batch_ids.insert(chunk.id.as_str()) {
                return Err(RagError::DuplicateChunk(chunk.id.clone()));
            }
        }
        Ok(())
    }

    /// Append pre-validated chunks, returning their sequence numbers.
    fn append(&mut self, chunks: Vec<Chunk>) -> Vec<u64> {
        let mut seqs = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.by_id.insert(chunk.id.clone(), seq);
            self.by_document.entry(chunk.document_id.clone()).or_default().push(seq);
            self.records.insert(seq, chunk);
            seqs.push(seq);
        }
        seqs
    }

    fn rollback_append(&mut self, seqs: &[u64]) {
        for seq in seqs {
            let Some(chunk) = self.records.remove(seq) else { continue };
            self.by_id.remove(&chunk.id);
            if let Some(list) = self.by_document.get_mut(&chunk.document_id) {
                list.retain(|s| s != seq);
                if list.is_empty() {
                    self.by_document.remove(&chunk.document_id);
                }
            }
        }
    }

    /// Remove a document's chunks, returning them with their sequence numbers.
    fn remove_document(&mut self, document_id: &str) -> Vec<(u64, Chunk)> {
        let Some(seqs) = self.by_document.remove(document_id) else {
            return Vec::new();
        };
        seqs.into_iter()
            .filter_map(|seq| {
                let chunk = self.records.remove(&seq)?;
                self.by_id.remove(&chunk.id);
                Some((seq, chunk))
            })
            .collect()
    }

    /// Undo [`remove_document`](Self::remove_document).
    fn restore(&mut self, removed: Vec<(u64, Chunk)>) {
        for (seq, chunk) in removed {
            self.by_id.insert(chunk.id.clone(), seq);
            self.by_document.entry(chunk.document_id.clone()).or_default().push(seq);
            self.records.insert(seq, chunk);
        }
    }

    fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<SearchResult>> {
        if query.len() != self.tag.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.tag.dimensions,
                actual: query.len(),
            });
        }

        let scored: Vec<(&Chunk, f32)> = self
            .records
            .values()
            .map(|chunk| (chunk, cosine_similarity(&chunk.embedding, query)))
            .collect();

        Ok(rank(scored, top_k, threshold)
            .into_iter()
            .map(|(chunk, score)| SearchResult { chunk: chunk.clone(), score })
            .collect())
    }

    fn document_chunks(&self, document_id: &str) -> Option<Vec<Chunk>> {
        let seqs = self.by_document.get(document_id)?;
        let mut chunks: Vec<Chunk> =
            seqs.iter().filter_map(|seq| self.records.get(seq).cloned()).collect();
        chunks.sort_by_key(|c| c.position);
        Some(chunks)
    }

    fn snapshot(&self) -> Vec<&Chunk> {
        self.records.values().collect()
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            total_documents: self.by_document.len(),
            total_chunks: self.records.len(),
            embedding_dimension: self.tag.dimensions,
            model_name: self.tag.model.clone(),
        }
    }
}

/// An in-memory vector index over chunks from one embedding space.
///
/// Search is an exact linear scan over every stored vector. Clones share the
/// same underlying state.
///
/// An index created with [`VectorIndex::open`] is bound to a file and writes
/// a snapshot after every successful mutation, under the same write lock; if
/// the write fails the mutation is undone and the error returned.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{ModelTag, VectorIndex};
///
/// let index = VectorIndex::open("data/index.json", ModelTag::new("all-MiniLM-L6-v2", 384)).await?;
/// index.insert(chunks).await?;
/// let hits = index.search(&query, 5, 0.7).await?;
/// ```
#[derive(Debug, Clone)]
pub struct VectorIndex {
    state: Arc<RwLock<IndexState>>,
    tag: ModelTag,
    autosave: Option<Arc<PathBuf>>,
}

impl VectorIndex {
    /// Create an empty, memory-only index for the given embedding space.
    pub fn new(tag: ModelTag) -> Self {
        Self { state: Arc::new(RwLock::new(IndexState::new(tag.clone()))), tag, autosave: None }
    }

    /// Load the index stored at `path`, or start empty if nothing is there.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexIncompatible`] if the file was written for a
    /// different embedding model or is corrupted, and
    /// [`RagError::Persistence`] if it cannot be read.
    pub async fn load(path: impl AsRef<Path>, tag: ModelTag) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let expected = tag.clone();
        let state = tokio::task::spawn_blocking(move || {
            let chunks = read_artifact(&path, &expected)?.unwrap_or_default();
            IndexState::from_chunks(expected, chunks)
                .map_err(|e| RagError::IndexIncompatible(e.to_string()))
        })
        .await??;

        info!(
            model = %tag,
            chunk_count = state.records.len(),
            document_count = state.by_document.len(),
            "loaded vector index"
        );
        Ok(Self { state: Arc::new(RwLock::new(state)), tag, autosave: None })
    }

    /// Like [`load`](Self::load), then keep `path` up to date after every mutation.
    pub async fn open(path: impl AsRef<Path>, tag: ModelTag) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut index = Self::load(&path, tag).await?;
        index.autosave = Some(Arc::new(path));
        Ok(index)
    }

    /// The file this index writes to after mutations, if any.
    pub fn persist_path(&self) -> Option<&Path> {
        self.autosave.as_deref().map(PathBuf::as_path)
    }

    /// Write a consistent snapshot of the index to `path`.
    ///
    /// Holds the write lock for the duration, so no mutation interleaves.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let guard = Arc::clone(&self.state).write_owned().await;
        tokio::task::spawn_blocking(move || write_artifact(&path, &guard.tag, guard.snapshot()))
            .await?
    }

    /// Number of chunks in the index.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Whether the index holds no chunks.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }
}

#[async_trait]
impl VectorStore for VectorIndex {
    fn model_tag(&self) -> &ModelTag {
        &self.tag
    }

    async fn insert(&self, chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let autosave = self.autosave.clone();
        let mut guard = Arc::clone(&self.state).write_owned().await;

        tokio::task::spawn_blocking(move || {
            guard.validate(&chunks).inspect_err(|e| {
                error!(error = %e, "rejected chunk batch");
            })?;
            let chunk_count = chunks.len();
            let seqs = guard.append(chunks);

            if let Some(path) = autosave {
                if let Err(e) = write_artifact(&path, &guard.tag, guard.snapshot()) {
                    error!(error = %e, chunk_count, "snapshot failed, rolling back insert");
                    guard.rollback_append(&seqs);
                    return Err(e);
                }
            }
            info!(chunk_count, total_chunks = guard.records.len(), "inserted chunks");
            Ok(())
        })
        .await?
    }

    async fn delete_by_document(&self, document_id: &str) -> Result<usize> {
        let autosave = self.autosave.clone();
        let document_id = document_id.to_string();
        let mut guard = Arc::clone(&self.state).write_owned().await;

        tokio::task::spawn_blocking(move || {
            let removed = guard.remove_document(&document_id);
            if removed.is_empty() {
                debug!(document.id = %document_id, "delete of unknown document ignored");
                return Ok(0);
            }

            let removed_count = removed.len();
            if let Some(path) = autosave {
                if let Err(e) = write_artifact(&path, &guard.tag, guard.snapshot()) {
                    error!(document.id = %document_id, error = %e, "snapshot failed, restoring document");
                    guard.restore(removed);
                    return Err(e);
                }
            }
            info!(document.id = %document_id, removed_count, "deleted document chunks");
            Ok(removed_count)
        })
        .await?
    }

    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        validate_retrieval(top_k, similarity_threshold)?;
        let query = embedding.to_vec();
        let guard = Arc::clone(&self.state).read_owned().await;

        let results = tokio::task::spawn_blocking(move || {
            guard.search(&query, top_k, similarity_threshold)
        })
        .await??;

        debug!(top_k, similarity_threshold, result_count = results.len(), "index search");
        Ok(results)
    }

    async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.state
            .read()
            .await
            .document_chunks(document_id)
            .ok_or_else(|| RagError::NotFound(document_id.to_string()))
    }

    async fn contains_document(&self, document_id: &str) -> bool {
        self.state.read().await.by_document.contains_key(document_id)
    }

    async fn stats(&self) -> IndexStats {
        self.state.read().await.stats()
    }
}
