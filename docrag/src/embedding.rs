//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::document::ModelTag;
use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// The model behind a provider is fixed for the provider's lifetime, so
/// [`model_id`](EmbeddingProvider::model_id) and
/// [`dimensions`](EmbeddingProvider::dimensions) never change. Construct one
/// provider at startup and share it as `Arc<dyn EmbeddingProvider>`.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends that
/// support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    ///
    /// A failure on any input fails the whole batch.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Return the identity of the underlying model.
    fn model_id(&self) -> &str;

    /// The [`ModelTag`] describing this provider's embedding space.
    fn model_tag(&self) -> ModelTag {
        ModelTag::new(self.model_id(), self.dimensions())
    }
}

/// Check that a provider returned one finite vector of the right length per input.
///
/// # Errors
///
/// Returns [`RagError::EmbeddingError`] naming the provider on any mismatch
/// or on a NaN or infinite component.
pub fn check_embeddings(
    provider: &dyn EmbeddingProvider,
    expected_count: usize,
    embeddings: &[Vec<f32>],
) -> Result<()> {
    if embeddings.len() != expected_count {
        return Err(RagError::EmbeddingError {
            provider: provider.model_id().to_string(),
            message: format!(
                "expected {expected_count} embeddings, backend returned {}",
                embeddings.len()
            ),
        });
    }
    let dimensions = provider.dimensions();
    if let Some((i, bad)) = embeddings.iter().enumerate().find(|(_, e)| e.len() != dimensions) {
        return Err(RagError::EmbeddingError {
            provider: provider.model_id().to_string(),
            message: format!(
                "embedding {i} has {} dimensions, model declares {dimensions}",
                bad.len()
            ),
        });
    }
    if let Some(i) = embeddings.iter().position(|e| e.iter().any(|v| !v.is_finite())) {
        return Err(RagError::EmbeddingError {
            provider: provider.model_id().to_string(),
            message: format!("embedding {i} contains NaN or infinite values"),
        });
    }
    Ok(())
}
