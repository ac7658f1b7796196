use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Gateway error during {operation}: {message}")]
    Gateway { operation: String, message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No documents have been added yet. Please upload a document before asking questions.")]
    EmptyIndex,

    #[error("No relevant documents found for this question")]
    NoResults,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Wrap a collaborator failure, keeping the whole cause chain in the message
    #[inline]
    pub fn gateway(operation: &str, error: &anyhow::Error) -> Self {
        Self::Gateway {
            operation: operation.to_string(),
            message: format!("{:#}", error),
        }
    }
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod generation;
pub mod index;
pub mod rag;
