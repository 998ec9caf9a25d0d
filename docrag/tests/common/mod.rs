//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docrag::{Chunk, EmbeddingProvider, RagError, Result};

/// Deterministic hash-based embeddings; equal texts give bit-identical vectors.
pub struct MockEmbeddingProvider {
    dimensions: usize,
    pub batch_calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, batch_calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            let mixed = hash.wrapping_add(i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            *v = (mixed >> 40) as f32 / (1u64 << 24) as f32 - 0.5;
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "mock-hash"
    }
}

/// Returns fixed vectors for known texts and fails on anything else.
pub struct TableEmbeddingProvider {
    table: HashMap<String, Vec<f32>>,
    dimensions: usize,
}

impl TableEmbeddingProvider {
    pub fn new(dimensions: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        let table = entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Self { table, dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.table.get(text).cloned().ok_or_else(|| RagError::EmbeddingError {
            provider: "table".into(),
            message: format!("no embedding for {text:?}"),
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "table"
    }
}

/// Declares one dimensionality but returns vectors of another.
pub struct WrongSizeEmbeddingProvider {
    pub declared: usize,
    pub actual: usize,
}

#[async_trait]
impl EmbeddingProvider for WrongSizeEmbeddingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; self.actual])
    }

    fn dimensions(&self) -> usize {
        self.declared
    }

    fn model_id(&self) -> &str {
        "mock-hash"
    }
}

pub fn chunk(document_id: &str, position: usize, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: Chunk::make_id(document_id, position),
        document_id: document_id.to_string(),
        position,
        text: format!("{document_id} chunk {position}"),
        embedding,
    }
}

/// Reference cosine similarity computed independently of the crate.
pub fn brute_force_cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { (dot / (na * nb)) as f32 }
}
