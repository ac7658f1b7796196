#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::embeddings::{Chunk, Embedding};
use crate::extract::FileType;
use crate::{RagError, Result};

/// Provenance stored alongside every indexed chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    pub source_file: String,
    pub file_type: FileType,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub inserted_at: DateTime<Utc>,
}

impl EntryMetadata {
    #[inline]
    pub fn for_chunk(chunk: &Chunk) -> Self {
        Self {
            source_file: chunk.source_file.clone(),
            file_type: chunk.file_type,
            chunk_index: chunk.chunk_index,
            total_chunks: chunk.total_chunks,
            inserted_at: Utc::now(),
        }
    }
}

/// A chunk stored in the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Position of the entry at insertion time
    pub id: usize,
    pub text: String,
    pub embedding: Embedding,
    pub metadata: EntryMetadata,
}

/// Entry matched by a search, with its cosine similarity to the query
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: Arc<IndexEntry>,
    pub similarity: f32,
}

/// Number of indexed chunks that came from one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source_file: String,
    pub file_type: FileType,
    pub chunks: usize,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<Arc<IndexEntry>>,
    dimension: Option<usize>,
}

impl IndexState {
    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(RagError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn push(&mut self, text: String, embedding: Embedding, metadata: EntryMetadata) -> usize {
        let id = self.entries.len();
        self.dimension.get_or_insert(embedding.len());
        self.entries.push(Arc::new(IndexEntry {
            id,
            text,
            embedding,
            metadata,
        }));
        id
    }
}

/// In-memory vector index searched by brute-force cosine similarity
///
/// Every query is an exact O(n·d) scan over all stored embeddings. The index
/// can be shared between tasks; appends take the write lock so ids are
/// assigned atomically, and searches score a consistent snapshot.
#[derive(Debug, Default)]
pub struct VectorIndex {
    state: RwLock<IndexState>,
}

impl VectorIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry and return its id
    ///
    /// The first insert fixes the index dimension; later embeddings must match it.
    #[inline]
    pub fn insert(
        &self,
        text: String,
        embedding: Embedding,
        metadata: EntryMetadata,
    ) -> Result<usize> {
        let mut state = self.write();
        state.check_dimension(embedding.len())?;
        Ok(state.push(text, embedding, metadata))
    }

    /// Append several entries under a single lock
    ///
    /// Either every entry is inserted with contiguous ids or, if any embedding
    /// has the wrong dimension, none is.
    #[inline]
    pub fn insert_batch(
        &self,
        items: Vec<(String, Embedding, EntryMetadata)>,
    ) -> Result<Vec<usize>> {
        let mut state = self.write();

        let expected = state
            .dimension
            .or_else(|| items.first().map(|(_, embedding, _)| embedding.len()));
        if let Some(expected) = expected {
            if let Some((_, embedding, _)) = items.iter().find(|(_, e, _)| e.len() != expected) {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let ids: Vec<usize> = items
            .into_iter()
            .map(|(text, embedding, metadata)| state.push(text, embedding, metadata))
            .collect();

        debug!(
            "Inserted {} entries into vector index ({} total)",
            ids.len(),
            state.entries.len()
        );
        Ok(ids)
    }

    /// Rank every entry against `query` and return the best `top_k`
    ///
    /// Results are in descending similarity; ties keep insertion order.
    #[inline]
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let entries = {
            let state = self.read();
            if state.entries.is_empty() {
                return Ok(Vec::new());
            }
            state.check_dimension(query.len())?;
            state.entries.clone()
        };

        let mut results = entries
            .into_iter()
            .map(|entry| {
                Ok(SearchResult {
                    similarity: cosine_similarity(query, &entry.embedding)?,
                    entry,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // sort_by is stable, so equal scores stay in insertion order
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(top_k);

        debug!(
            "Vector search returned {} results (top similarity: {:?})",
            results.len(),
            results.first().map(|r| r.similarity)
        );
        Ok(results)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.read().entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Dimension shared by every stored embedding, once the first entry exists
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.read().dimension
    }

    /// Snapshot of all entries in insertion order
    #[inline]
    pub fn all_entries(&self) -> Vec<Arc<IndexEntry>> {
        self.read().entries.clone()
    }

    /// Chunk counts per source file, in the order files were first indexed
    #[inline]
    pub fn sources(&self) -> Vec<SourceSummary> {
        let state = self.read();
        let mut sources: Vec<SourceSummary> = Vec::new();

        for entry in &state.entries {
            let metadata = &entry.metadata;
            match sources
                .iter_mut()
                .find(|s| s.source_file == metadata.source_file)
            {
                Some(summary) => summary.chunks += 1,
                None => sources.push(SourceSummary {
                    source_file: metadata.source_file.clone(),
                    file_type: metadata.file_type,
                    chunks: 1,
                }),
            }
        }

        sources
    }

    /// Forget every entry; ids restart from zero
    #[inline]
    pub fn clear(&self) {
        let mut state = self.write();
        let removed = state.entries.len();
        *state = IndexState::default();
        info!("Cleared vector index ({} entries removed)", removed);
    }
}

/// Cosine similarity of two vectors, defined as 0 when either has zero norm
///
/// Vectors of different lengths are a [`RagError::DimensionMismatch`].
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot = x.mul_add(y, dot);
        norm_a = x.mul_add(x, norm_a);
        norm_b = y.mul_add(y, norm_b);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32)
}
