//! Retrieval orchestrator.
//!
//! The [`Retriever`] turns "add document" and "query" requests into index
//! mutations and ranked results by composing a [`Chunker`], an
//! [`EmbeddingProvider`], and a [`VectorStore`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag::{RagConfig, Retriever, VectorIndex};
//!
//! let embedder = Arc::new(FastEmbedProvider::new("all-MiniLM-L6-v2")?);
//! let index = VectorIndex::open("data/index.json", embedder.model_tag()).await?;
//!
//! let retriever = Retriever::builder()
//!     .config(RagConfig::from_env()?)
//!     .embedding_provider(embedder)
//!     .vector_store(Arc::new(index))
//!     .build()?;
//!
//! let chunk_count = retriever.add_document("doc-1", &text, 1000, 200).await?;
//! let hits = retriever.query("what is the refund policy?", 5, 0.7).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::{RagConfig, validate_chunking, validate_retrieval};
use crate::document::{Chunk, IndexStats, RetrievalResult};
use crate::embedding::{EmbeddingProvider, check_embeddings};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Coordinates ingestion (chunk → embed → insert) and queries
/// (embed → search). Holds no chunk state of its own.
///
/// Construct one via [`Retriever::builder()`].
pub struct Retriever {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl Retriever {
    /// Create a new [`RetrieverBuilder`].
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Chunk, embed, and index one document; returns the number of chunks created.
    ///
    /// Nothing is committed unless every stage succeeds. Empty text creates
    /// no chunks and leaves the index untouched.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigurationError`] for an empty `document_id` or an
    ///   invalid `(chunk_size, overlap)` pair.
    /// - [`RagError::EmbeddingError`] if the backend fails on any chunk.
    /// - [`RagError::DuplicateChunk`] if the document is already indexed.
    /// - [`RagError::DimensionMismatch`] / [`RagError::Persistence`] from the store.
    pub async fn add_document(
        &self,
        document_id: &str,
        text: &str,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<usize> {
        if document_id.trim().is_empty() {
            return Err(RagError::ConfigurationError("document_id must not be empty".into()));
        }
        validate_chunking(chunk_size, overlap)?;
        if self.vector_store.contains_document(document_id).await {
            return Err(RagError::DuplicateChunk(Chunk::make_id(document_id, 0)));
        }

        let texts = self.chunker.split(text, chunk_size, overlap)?;
        if texts.is_empty() {
            info!(document.id = %document_id, chunk_count = 0, "ingested document (empty)");
            return Ok(0);
        }

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.embedding_provider.embed_batch(&refs).await.inspect_err(|e| {
            error!(document.id = %document_id, error = %e, "embedding failed during ingestion");
        })?;
        check_embeddings(self.embedding_provider.as_ref(), texts.len(), &embeddings)?;

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (text, embedding))| Chunk {
                id: Chunk::make_id(document_id, position),
                document_id: document_id.to_string(),
                position,
                text,
                embedding,
            })
            .collect();
        let chunk_count = chunks.len();

        self.vector_store.insert(chunks).await.inspect_err(|e| {
            error!(document.id = %document_id, error = %e, "insert failed during ingestion");
        })?;

        info!(document.id = %document_id, chunk_count, "ingested document");
        Ok(chunk_count)
    }

    /// [`add_document`](Self::add_document) with the configured chunk size and overlap.
    pub async fn ingest(&self, document_id: &str, text: &str) -> Result<usize> {
        self.add_document(document_id, text, self.config.chunk_size, self.config.chunk_overlap)
            .await
    }

    /// Remove every chunk of a document; returns how many were removed.
    ///
    /// Unknown document ids are not an error.
    pub async fn remove_document(&self, document_id: &str) -> Result<usize> {
        let removed = self.vector_store.delete_by_document(document_id).await?;
        info!(document.id = %document_id, removed, "removed document");
        Ok(removed)
    }

    /// Embed `query_text` once and return the best-matching chunks.
    ///
    /// Results are ordered by descending score; at most `top_k` are returned
    /// and none scores below `similarity_threshold`. An index with no match
    /// above the threshold yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigurationError`] for `top_k == 0` or a threshold outside `[0, 1]`.
    /// - [`RagError::EmbeddingError`] if the query cannot be embedded.
    pub async fn query(
        &self,
        query_text: &str,
        top_k: usize,
        similarity_threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        validate_retrieval(top_k, similarity_threshold)?;

        let embedding = self.embedding_provider.embed(query_text).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;
        check_embeddings(self.embedding_provider.as_ref(), 1, std::slice::from_ref(&embedding))?;

        let results = self.vector_store.search(&embedding, top_k, similarity_threshold).await?;

        info!(top_k, similarity_threshold, result_count = results.len(), "query completed");
        Ok(results.into_iter().map(RetrievalResult::from).collect())
    }

    /// [`query`](Self::query) with the configured `top_k` and threshold.
    pub async fn search(&self, query_text: &str) -> Result<Vec<RetrievalResult>> {
        self.query(query_text, self.config.top_k, self.config.similarity_threshold).await
    }

    /// The indexed chunks of one document, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if the document has no chunks in the index.
    pub async fn document_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.vector_store.document_chunks(document_id).await
    }

    /// Summary counters for the underlying index.
    pub async fn stats(&self) -> IndexStats {
        self.vector_store.stats().await
    }
}

/// Builder for constructing a [`Retriever`].
///
/// `embedding_provider` and `vector_store` are required. `config` defaults to
/// [`RagConfig::default()`]; `chunker` defaults to a [`FixedSizeChunker`] using
/// the config's boundary tolerance.
#[derive(Default)]
pub struct RetrieverBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RetrieverBuilder {
    /// Set the retriever configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`Retriever`].
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigurationError`] if a required field is missing or
    ///   the config is invalid.
    /// - [`RagError::IndexIncompatible`] if the store was built for a different
    ///   embedding model than the provider serves.
    pub fn build(self) -> Result<Retriever> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::ConfigurationError("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigurationError("vector_store is required".to_string()))?;

        let provider_tag = embedding_provider.model_tag();
        if vector_store.model_tag() != &provider_tag {
            return Err(RagError::IndexIncompatible(format!(
                "vector store holds {} embeddings but the provider produces {provider_tag}",
                vector_store.model_tag()
            )));
        }

        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(
                FixedSizeChunker::new().with_boundary_tolerance(config.boundary_tolerance),
            ),
        };

        Ok(Retriever { config, embedding_provider, vector_store, chunker })
    }
}
