//! # docrag
//!
//! Retrieval core for document question answering.
//!
//! Documents arrive as plain text, are split into overlapping chunks, embedded
//! with a sentence-embedding model, and stored in an exact (brute-force)
//! cosine-similarity index that persists to a single versioned file. Queries
//! are embedded with the same model and answered with ranked chunk texts plus
//! their provenance, ready to hand to an answer-generation service.
//!
//! ## Components
//!
//! - [`FixedSizeChunker`]: sliding character window with overlap
//! - [`EmbeddingProvider`]: text → fixed-length vectors
//!   (`local::FastEmbedProvider` with the `fastembed` feature,
//!   `openai::OpenAIEmbeddingProvider` with the `openai` feature)
//! - [`VectorIndex`]: in-memory index with durable snapshots
//! - [`Retriever`]: add/remove documents and run queries
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{EmbeddingProvider, RagConfig, Retriever, VectorIndex};
//! use docrag::local::FastEmbedProvider;
//!
//! let embedder = Arc::new(FastEmbedProvider::new("all-MiniLM-L6-v2")?);
//! let index = VectorIndex::open("data/vector_store/index.json", embedder.model_tag()).await?;
//! let retriever = Retriever::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .vector_store(Arc::new(index))
//!     .build()?;
//!
//! retriever.ingest("handbook", &handbook_text).await?;
//! for hit in retriever.search("how many vacation days?").await? {
//!     println!("{:.3} {} #{}", hit.score, hit.document_id, hit.position);
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod persistence;
pub mod retriever;
pub mod similarity;
pub mod vectorstore;

#[cfg(feature = "fastembed")]
pub mod local;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{IndexSettings, RagConfig, RagConfigBuilder};
pub use document::{Chunk, IndexStats, ModelTag, RetrievalResult, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::VectorIndex;
pub use retriever::{Retriever, RetrieverBuilder};
pub use vectorstore::VectorStore;
