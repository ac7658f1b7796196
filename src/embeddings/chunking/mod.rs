
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::FileType;
use crate::{RagError, Result};

/// Sentence terminators the chunker prefers to cut after
const SENTENCE_TERMINATORS: [char; 3] = ['.', '?', '!'];

/// A boundary is only taken if it sits past this fraction of the window
const BOUNDARY_THRESHOLD: f64 = 0.5;

/// Represents a chunk of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub text: String,
    /// Name of the file this chunk was cut from
    pub source_file: String,
    /// Type of the source file
    pub file_type: FileType,
    /// Position of this chunk within its document
    pub chunk_index: usize,
    /// Number of chunks the document was split into
    pub total_chunks: usize,
}

/// Configuration for document chunking, measured in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size for a single chunk
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        validate_window(self.chunk_size, self.chunk_overlap)
    }
}

fn validate_window(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::Config(
            "Chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::Config(format!(
            "Chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Collapse every run of whitespace (blank lines included) into a single space
#[inline]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into overlapping, boundary-aware chunks
///
/// Lengths are counted in characters. Each window prefers to end just after a
/// sentence terminator, then at a space, and only falls back to a hard cut
/// when neither appears in the second half of the window.
#[inline]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_window(chunk_size, overlap)?;

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![trimmed.to_string()]);
    }

    let threshold = chunk_size as f64 * BOUNDARY_THRESHOLD;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());

        if end < chars.len() {
            let window = &chars[start..end];
            let sentence_cut = window
                .iter()
                .rposition(|c| SENTENCE_TERMINATORS.contains(c))
                .filter(|&pos| pos as f64 > threshold);

            if let Some(pos) = sentence_cut {
                end = start + pos + 1;
            } else if let Some(pos) = window
                .iter()
                .rposition(|&c| c == ' ')
                .filter(|&pos| pos as f64 > threshold)
            {
                end = start + pos;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }

        // The boundary search can land close enough to `start` that the overlap
        // would rewind past it
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    Ok(chunks)
}

/// Normalise and chunk a document, labelling each chunk with its provenance
#[inline]
pub fn chunk_document(
    text: &str,
    source_file: &str,
    file_type: FileType,
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>> {
    let normalized = normalize_text(text);
    let pieces = chunk_text(&normalized, config.chunk_size, config.chunk_overlap)?;
    let total_chunks = pieces.len();

    let chunks: Vec<Chunk> = pieces
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            text,
            source_file: source_file.to_string(),
            file_type,
            chunk_index,
            total_chunks,
        })
        .collect();

    debug!(
        "Chunked '{}' into {} chunks (avg {} chars)",
        source_file,
        chunks.len(),
        chunks.iter().map(|c| c.text.chars().count()).sum::<usize>() / chunks.len().max(1)
    );

    Ok(chunks)
}
