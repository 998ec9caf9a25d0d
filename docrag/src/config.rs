//! Configuration for chunking, retrieval, and the persisted index.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default embedding model served by the local sentence-embedding backend.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Dimensionality of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Chunking and retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum cosine similarity for results, in `[0, 1]`.
    pub similarity_threshold: f32,
    /// How far (in characters) a chunk end may move back to land on a
    /// sentence or word boundary. Zero means a pure fixed-width window.
    #[serde(default)]
    pub boundary_tolerance: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: 0.7,
            boundary_tolerance: 0,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a config from the defaults overridden by environment variables.
    ///
    /// Recognised variables: `CHUNK_SIZE`, `CHUNK_OVERLAP`, `DEFAULT_TOP_K`,
    /// `SIMILARITY_THRESHOLD`, `CHUNK_BOUNDARY_TOLERANCE`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if a variable does not parse
    /// or the resulting config is invalid.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        RagConfig::builder()
            .chunk_size(env_or("CHUNK_SIZE", defaults.chunk_size)?)
            .chunk_overlap(env_or("CHUNK_OVERLAP", defaults.chunk_overlap)?)
            .top_k(env_or("DEFAULT_TOP_K", defaults.top_k)?)
            .similarity_threshold(env_or("SIMILARITY_THRESHOLD", defaults.similarity_threshold)?)
            .boundary_tolerance(env_or("CHUNK_BOUNDARY_TOLERANCE", defaults.boundary_tolerance)?)
            .build()
    }

    /// Check every parameter of this config.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        validate_retrieval(self.top_k, self.similarity_threshold)
    }
}

/// Check a `(chunk_size, overlap)` pair.
///
/// # Errors
///
/// Returns [`RagError::ConfigurationError`] unless `chunk_size > 0` and
/// `overlap < chunk_size`.
pub fn validate_chunking(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigurationError("chunk_size must be greater than zero".into()));
    }
    if overlap >= chunk_size {
        return Err(RagError::ConfigurationError(format!(
            "chunk_overlap ({overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Check a `(top_k, similarity_threshold)` pair.
///
/// # Errors
///
/// Returns [`RagError::ConfigurationError`] unless `top_k > 0` and the
/// threshold lies in `[0, 1]`.
pub fn validate_retrieval(top_k: usize, similarity_threshold: f32) -> Result<()> {
    if top_k == 0 {
        return Err(RagError::ConfigurationError("top_k must be greater than zero".into()));
    }
    if !(0.0..=1.0).contains(&similarity_threshold) {
        return Err(RagError::ConfigurationError(format!(
            "similarity_threshold ({similarity_threshold}) must be within [0, 1]"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set the boundary snapping tolerance in characters.
    pub fn boundary_tolerance(mut self, tolerance: usize) -> Self {
        self.config.boundary_tolerance = tolerance;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `similarity_threshold` is outside `[0, 1]`
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Process-level settings for the embedding model and the persisted index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexSettings {
    /// Directory holding the persisted index artifact.
    pub vector_store_path: PathBuf,
    /// Identity of the embedding model; recorded in the artifact.
    pub embedding_model: String,
    /// Dimensionality produced by `embedding_model`.
    pub embedding_dimension: usize,
    /// Upper bound on blocking worker threads used for inference and search.
    pub worker_threads: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            vector_store_path: PathBuf::from("./data/vector_store"),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            worker_threads: 4,
        }
    }
}

impl IndexSettings {
    /// File name of the index artifact inside `vector_store_path`.
    pub const INDEX_FILE: &'static str = "index.json";

    /// Build settings from the defaults overridden by environment variables.
    ///
    /// Recognised variables: `VECTOR_STORE_PATH`, `EMBEDDING_MODEL`,
    /// `EMBEDDING_DIMENSION`, `WORKER_THREADS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            vector_store_path: std::env::var("VECTOR_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_store_path),
            embedding_model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimension: env_or("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            worker_threads: env_or("WORKER_THREADS", defaults.worker_threads)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings describe a usable index.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(RagError::ConfigurationError("embedding_model must not be empty".into()));
        }
        if self.embedding_dimension == 0 {
            return Err(RagError::ConfigurationError(
                "embedding_dimension must be greater than zero".into(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(RagError::ConfigurationError(
                "worker_threads must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Full path of the index artifact.
    pub fn index_file(&self) -> PathBuf {
        self.vector_store_path.join(Self::INDEX_FILE)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            RagError::ConfigurationError(format!("invalid value for {key} ({raw:?}): {e}"))
        }),
        Err(_) => Ok(default),
    }
}
