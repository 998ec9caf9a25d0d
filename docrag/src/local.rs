//! Local sentence-embedding provider backed by `fastembed` (ONNX runtime).
//!
//! This module is only available when the `fastembed` feature is enabled.
//! Model weights are downloaded on first use and cached on disk.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, error, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "fastembed";

/// Models this provider knows how to load, with their dimensionality.
const SUPPORTED_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
    ("bge-large-en-v1.5", 1024),
];

fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    let model = match name {
        "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
        "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        other => {
            let known: Vec<&str> = SUPPORTED_MODELS.iter().map(|(n, _)| *n).collect();
            return Err(RagError::ConfigurationError(format!(
                "unsupported embedding model '{other}' (supported: {})",
                known.join(", ")
            )));
        }
    };
    let dimensions = SUPPORTED_MODELS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| *d)
        .unwrap_or_default();
    Ok((model, dimensions))
}

/// An [`EmbeddingProvider`] running a sentence-embedding model in-process.
///
/// Inference is CPU-bound, so every call is moved onto tokio's blocking
/// thread pool. The loaded model is shared behind a mutex; clones of the
/// provider share the same weights.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::local::FastEmbedProvider;
///
/// let provider = FastEmbedProvider::new("all-MiniLM-L6-v2")?;
/// let vectors = provider.embed_batch(&["first", "second"]).await?;
/// ```
#[derive(Clone)]
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_id: String,
    dimensions: usize,
}

impl FastEmbedProvider {
    /// Load `model_name`, downloading weights into the default cache if needed.
    ///
    /// This blocks while the model loads; call it once at startup.
    pub fn new(model_name: &str) -> Result<Self> {
        Self::load(model_name, None)
    }

    /// Load `model_name` using `cache_dir` for downloaded weights.
    pub fn with_cache_dir(model_name: &str, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::load(model_name, Some(cache_dir.into()))
    }

    fn load(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let (model, dimensions) = resolve_model(model_name)?;
        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let embedding = TextEmbedding::try_new(options).map_err(|e| {
            error!(provider = PROVIDER, model = model_name, error = %e, "model load failed");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to load model '{model_name}': {e}"),
            }
        })?;
        info!(provider = PROVIDER, model = model_name, dimensions, "embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(embedding)),
            model_id: model_name.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(&[text]).await?;
        results.pop().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "model returned no embedding".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model_id, "embedding batch");

        let owned: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();
        let model = Arc::clone(&self.model);
        let embeddings = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|_| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "model lock poisoned by an earlier panic".into(),
            })?;
            model.embed(owned, None).map_err(|e| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("inference failed: {e}"),
            })
        })
        .await??;

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_models_with_dimensions() {
        let (_, dims) = resolve_model("all-MiniLM-L6-v2").unwrap();
        assert_eq!(dims, 384);
        let (_, dims) = resolve_model("bge-base-en-v1.5").unwrap();
        assert_eq!(dims, 768);
    }

    #[test]
    fn rejects_unknown_model() {
        assert!(matches!(resolve_model("word2vec"), Err(RagError::ConfigurationError(_))));
    }

    #[tokio::test]
    #[ignore = "downloads model, run with --ignored"]
    async fn embedding_is_deterministic() {
        let provider = FastEmbedProvider::new("all-MiniLM-L6-v2").unwrap();
        let a = provider.embed("the same sentence").await.unwrap();
        let b = provider.embed("the same sentence").await.unwrap();
        assert_eq!(a.len(), 384);
        assert_eq!(a, b);
    }
}
