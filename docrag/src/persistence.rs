//! Versioned on-disk format for the vector index.
//!
//! An index is stored as a single JSON document:
//!
//! ```json
//! {
//!   "format": "docrag-index",
//!   "schema_version": 1,
//!   "model": { "model": "all-MiniLM-L6-v2", "dimensions": 384 },
//!   "saved_at": "2026-01-01T00:00:00Z",
//!   "checksum": "<sha-256 hex>",
//!   "chunks": [ { "id": "...", "document_id": "...", "position": 0, "text": "...", "embedding": [...] } ]
//! }
//! ```
//!
//! Chunks are written in insertion order, which is the order search uses to
//! break score ties. The checksum covers every chunk field, so truncated or
//! edited files are refused instead of being partially loaded. Writes go to a
//! sibling temporary file that is renamed over the target.

use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::document::{Chunk, ModelTag};
use crate::error::{RagError, Result};

/// Value of the `format` field.
pub const FORMAT_NAME: &str = "docrag-index";

/// Schema version written by this build; the only version it reads.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArtifactOut<'a> {
    format: &'static str,
    schema_version: u32,
    model: &'a ModelTag,
    saved_at: DateTime<Utc>,
    checksum: String,
    chunks: Vec<&'a Chunk>,
}

#[derive(Deserialize)]
struct ArtifactIn {
    format: String,
    schema_version: u32,
    model: ModelTag,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    checksum: String,
    chunks: Vec<Chunk>,
}

/// SHA-256 over every chunk field, length-prefixed so that field boundaries
/// cannot shift between chunks.
fn checksum<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
    fn put_str(hasher: &mut Sha256, s: &str) {
        hasher.update((s.len() as u64).to_le_bytes());
        hasher.update(s.as_bytes());
    }

    let mut hasher = Sha256::new();
    for chunk in chunks {
        put_str(&mut hasher, &chunk.id);
        put_str(&mut hasher, &chunk.document_id);
        hasher.update((chunk.position as u64).to_le_bytes());
        put_str(&mut hasher, &chunk.text);
        hasher.update((chunk.embedding.len() as u64).to_le_bytes());
        for value in &chunk.embedding {
            hasher.update(value.to_le_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` and flush them to disk before returning.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Write `chunks` (in insertion order) for the embedding space `model`.
///
/// Blocking; call from a blocking context.
pub(crate) fn write_artifact(path: &Path, model: &ModelTag, chunks: Vec<&Chunk>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RagError::persistence(parent, e))?;
    }

    let chunk_count = chunks.len();
    let artifact = ArtifactOut {
        format: FORMAT_NAME,
        schema_version: SCHEMA_VERSION,
        model,
        saved_at: Utc::now(),
        checksum: checksum(chunks.iter().copied()),
        chunks,
    };
    let bytes = serde_json::to_vec(&artifact).map_err(|e| RagError::persistence(path, e))?;

    let tmp = temp_path(path);
    write_synced(&tmp, &bytes).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        RagError::persistence(&tmp, e)
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        RagError::persistence(path, e)
    })?;

    info!(path = %path.display(), chunk_count, bytes = bytes.len(), "saved vector index");
    Ok(())
}

/// Read the chunk set stored at `path`, in insertion order.
///
/// Returns `Ok(None)` when nothing exists at `path`. Blocking.
///
/// # Errors
///
/// - [`RagError::IndexIncompatible`] when the file is not a readable index of
///   this schema version, its checksum does not match, or it was built with a
///   different embedding model than `expected`.
/// - [`RagError::Persistence`] when the file exists but cannot be read.
pub(crate) fn read_artifact(path: &Path, expected: &ModelTag) -> Result<Option<Vec<Chunk>>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "no persisted index found, starting empty");
            return Ok(None);
        }
        Err(e) => return Err(RagError::persistence(path, e)),
    };

    let artifact: ArtifactIn = serde_json::from_slice(&bytes).map_err(|e| {
        RagError::IndexIncompatible(format!("{} is not a readable index: {e}", path.display()))
    })?;

    if artifact.format != FORMAT_NAME {
        return Err(RagError::IndexIncompatible(format!(
            "unexpected format '{}' (expected '{FORMAT_NAME}')",
            artifact.format
        )));
    }
    if artifact.schema_version != SCHEMA_VERSION {
        return Err(RagError::IndexIncompatible(format!(
            "unsupported schema version {} (this build reads {SCHEMA_VERSION})",
            artifact.schema_version
        )));
    }
    if &artifact.model != expected {
        return Err(RagError::IndexIncompatible(format!(
            "index was built with {} but the configured model is {expected}",
            artifact.model
        )));
    }
    if checksum(&artifact.chunks) != artifact.checksum {
        return Err(RagError::IndexIncompatible(format!(
            "checksum mismatch in {}; the file is corrupted",
            path.display()
        )));
    }

    let mut seen = HashSet::with_capacity(artifact.chunks.len());
    for chunk in &artifact.chunks {
        if chunk.embedding.len() != expected.dimensions {
            return Err(RagError::IndexIncompatible(format!(
                "chunk '{}' has {} dimensions, model tag declares {}",
                chunk.id,
                chunk.embedding.len(),
                expected.dimensions
            )));
        }
        if !seen.insert(chunk.id.as_str()) {
            return Err(RagError::IndexIncompatible(format!(
                "chunk id '{}' appears more than once",
                chunk.id
            )));
        }
    }

    debug!(path = %path.display(), chunk_count = artifact.chunks.len(), "read vector index");
    Ok(Some(artifact.chunks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, doc: &str, position: usize, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.into(),
            document_id: doc.into(),
            position,
            text: format!("text of {id}"),
            embedding,
        }
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let tag = ModelTag::new("m", 2);
        assert!(read_artifact(&dir.path().join("absent.json"), &tag).unwrap().is_none());
    }

    #[test]
    fn written_artifact_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/index.json");
        let tag = ModelTag::new("m", 2);
        let chunks = vec![chunk("b_0", "b", 0, vec![0.1, 0.2]), chunk("a_0", "a", 0, vec![1.0, -3.5])];

        write_artifact(&path, &tag, chunks.iter().collect()).unwrap();
        let read = read_artifact(&path, &tag).unwrap().unwrap();
        assert_eq!(read, chunks);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn failed_write_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let tag = ModelTag::new("m", 2);
        let first = vec![chunk("a_0", "a", 0, vec![0.5, 0.5])];
        write_artifact(&path, &tag, first.iter().collect()).unwrap();

        std::fs::create_dir(temp_path(&path)).unwrap();
        let second = vec![chunk("b_0", "b", 0, vec![1.0, 0.0])];
        let err = write_artifact(&path, &tag, second.iter().collect()).unwrap_err();
        assert!(matches!(err, RagError::Persistence { .. }));

        assert_eq!(read_artifact(&path, &tag).unwrap().unwrap(), first);
    }

    #[test]
    fn model_mismatch_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        write_artifact(&path, &ModelTag::new("m", 2), vec![]).unwrap();

        let err = read_artifact(&path, &ModelTag::new("other", 2)).unwrap_err();
        assert!(matches!(err, RagError::IndexIncompatible(_)));
        let err = read_artifact(&path, &ModelTag::new("m", 3)).unwrap_err();
        assert!(matches!(err, RagError::IndexIncompatible(_)));
    }

    #[test]
    fn tampered_text_fails_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let tag = ModelTag::new("m", 2);
        let chunks = vec![chunk("a_0", "a", 0, vec![0.5, 0.5])];
        write_artifact(&path, &tag, chunks.iter().collect()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replace("text of a_0", "text of zz")).unwrap();
        let err = read_artifact(&path, &tag).unwrap_err();
        assert!(matches!(err, RagError::IndexIncompatible(msg) if msg.contains("checksum")));
    }

    #[test]
    fn garbage_and_foreign_schema_are_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let tag = ModelTag::new("m", 2);

        std::fs::write(&path, b"\x80\x03pickle").unwrap();
        assert!(matches!(read_artifact(&path, &tag), Err(RagError::IndexIncompatible(_))));

        write_artifact(&path, &tag, vec![]).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replace("\"schema_version\":1", "\"schema_version\":9")).unwrap();
        let err = read_artifact(&path, &tag).unwrap_err();
        assert!(matches!(err, RagError::IndexIncompatible(msg) if msg.contains("schema version")));
    }
}
