// Embeddings module
// Document chunking and the embedding gateway used to vectorise chunks and questions

pub mod chunking;
pub mod ollama;

use async_trait::async_trait;

use crate::Result;

pub use chunking::{Chunk, ChunkingConfig, chunk_document, chunk_text, normalize_text};
pub use ollama::OllamaClient;

/// Fixed-length numeric representation of a piece of text
pub type Embedding = Vec<f32>;

/// Maps text to an embedding vector
///
/// Implementations report collaborator failures as [`crate::RagError::Gateway`].
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}
