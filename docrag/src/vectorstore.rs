//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, IndexStats, ModelTag, SearchResult};
use crate::error::Result;

/// A storage backend for chunk embeddings with similarity search.
///
/// A store holds vectors from exactly one embedding space, identified by its
/// [`ModelTag`]. Mutations are all-or-nothing: a failed call leaves the store
/// unchanged.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{ModelTag, VectorIndex, VectorStore};
///
/// let store = VectorIndex::new(ModelTag::new("all-MiniLM-L6-v2", 384));
/// store.insert(chunks).await?;
/// let results = store.search(&query_embedding, 5, 0.0).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The embedding space this store accepts.
    fn model_tag(&self) -> &ModelTag;

    /// Insert chunks that already carry their embeddings.
    ///
    /// Either every chunk is inserted or none is.
    async fn insert(&self, chunks: Vec<Chunk>) -> Result<()>;

    /// Remove every chunk of `document_id`, returning how many were removed.
    ///
    /// Unknown document ids are a no-op and return 0.
    async fn delete_by_document(&self, document_id: &str) -> Result<usize>;

    /// Return at most `top_k` chunks scoring at least `similarity_threshold`
    /// against `embedding`, ordered by descending score.
    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Return the chunks of `document_id` ordered by position.
    async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// Whether any chunk of `document_id` is stored.
    async fn contains_document(&self, document_id: &str) -> bool;

    /// Summary counters for the store.
    async fn stats(&self) -> IndexStats;
}
