//! Data types for chunks, search results, and index metadata.

use serde::{Deserialize, Serialize};

/// A segment of a source document with its vector embedding.
///
/// Chunks are immutable once created; they are only ever removed together
/// with their owning document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{position}`.
    pub id: String,
    /// The ID of the owning document.
    pub document_id: String,
    /// Zero-based order of the chunk within the document's text.
    pub position: usize,
    /// The chunk's literal substring of the document, overlap included.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Build the canonical chunk id for a document position.
    pub fn make_id(document_id: &str, position: usize) -> String {
        format!("{document_id}_{position}")
    }
}

/// A stored [`Chunk`] paired with its similarity to a query vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The cosine similarity score (higher is more relevant).
    pub score: f32,
}

/// A retrieval hit as handed to callers: text and provenance, never vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// Id of the matching chunk, `"{document_id}_{position}"`.
    pub chunk_id: String,
    /// Document the chunk was cut from.
    pub document_id: String,
    /// Zero-based index of the chunk within its document.
    pub position: usize,
    /// The chunk's text.
    pub chunk_text: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

impl From<SearchResult> for RetrievalResult {
    fn from(result: SearchResult) -> Self {
        let SearchResult { chunk, score } = result;
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            position: chunk.position,
            chunk_text: chunk.text,
            score,
        }
    }
}

/// Identity of the embedding space an index was built in.
///
/// Two indexes are only comparable when their tags are equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ModelTag {
    /// Embedding model name, e.g. `all-MiniLM-L6-v2`.
    pub model: String,
    /// Length of every vector produced by `model`.
    pub dimensions: usize,
}

impl ModelTag {
    /// Tag for `model` producing vectors of length `dimensions`.
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self { model: model.into(), dimensions }
    }
}

impl std::fmt::Display for ModelTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}d", self.model, self.dimensions)
    }
}

/// Summary counters for an index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of distinct documents with at least one chunk.
    pub total_documents: usize,
    /// Number of stored chunks.
    pub total_chunks: usize,
    /// Length of every stored vector.
    pub embedding_dimension: usize,
    /// Embedding model the index was built with.
    pub model_name: String,
}
