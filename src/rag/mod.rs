// Retrieval module
// Ties extraction, chunking, embedding, the vector index and generation together

pub mod fallback;


use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embeddings::{
    ChunkingConfig, Embedding, EmbeddingGateway, OllamaClient, chunk_document,
};
use crate::extract::{FileType, extract_text};
use crate::generation::{GenerationGateway, build_context, build_prompt, clean_answer};
use crate::index::{EntryMetadata, SearchResult, SourceSummary, VectorIndex};
use crate::{RagError, Result};

pub use fallback::{FALLBACK_APOLOGY, FallbackExtractor, HeuristicExtractor};

/// Characters of chunk text shown in a relevant-document preview
const PREVIEW_LENGTH: usize = 100;
const DEFAULT_EMBEDDING_CONCURRENCY: usize = 8;

/// Tunables that can change during a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSettings {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub max_answer_length: u32,
}

impl Default for SessionSettings {
    #[inline]
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            top_k: 3,
            max_answer_length: 300,
        }
    }
}

impl From<&Config> for SessionSettings {
    #[inline]
    fn from(config: &Config) -> Self {
        Self {
            chunking: config.chunking,
            top_k: config.retrieval.top_k,
            max_answer_length: config.retrieval.max_answer_length,
        }
    }
}

/// Outcome of adding one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub source_file: String,
    pub chunks_added: usize,
    /// Entries in the index once this document was added
    pub total_documents: usize,
}

/// Where the text of an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Generated,
    Fallback,
}

/// A retrieved chunk as reported back to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevantDocument {
    pub preview: String,
    /// Cosine similarity rounded to four decimals
    pub similarity: f64,
    pub metadata: EntryMetadata,
}

impl RelevantDocument {
    fn from_result(result: &SearchResult) -> Self {
        Self {
            preview: preview(&result.entry.text),
            similarity: round_similarity(result.similarity),
            metadata: result.entry.metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    /// The assembled context handed to the generation model
    pub context: String,
    pub relevant_documents: Vec<RelevantDocument>,
    pub answer_source: AnswerSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total_chunks: usize,
    pub dimension: Option<usize>,
    pub sources: Vec<SourceSummary>,
}

/// A question-answering session over the documents added to it
///
/// The session owns its vector index and can be shared between tasks behind
/// an `Arc`. Nothing is persisted; dropping the session drops every document.
pub struct RagSession {
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingGateway>,
    generator: Arc<dyn GenerationGateway>,
    fallback: Arc<dyn FallbackExtractor>,
    settings: RwLock<SessionSettings>,
    embedding_concurrency: usize,
}

impl RagSession {
    /// Create a session with default settings and the heuristic fallback
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingGateway>,
        generator: Arc<dyn GenerationGateway>,
    ) -> Self {
        Self {
            index: VectorIndex::new(),
            embedder,
            generator,
            fallback: Arc::new(HeuristicExtractor),
            settings: RwLock::new(SessionSettings::default()),
            embedding_concurrency: DEFAULT_EMBEDDING_CONCURRENCY,
        }
    }

    /// Create a session backed by the Ollama server named in `config`
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Config(e.to_string()))?;

        let client = OllamaClient::new(&config.ollama)
            .map_err(|e| RagError::Config(format!("{:#}", e)))?;

        info!(
            "Created session using {} (embedding: {}, generation: {})",
            config.ollama.ollama_url().map_or_else(|e| e.to_string(), |u| u.to_string()),
            config.ollama.embedding_model,
            config.ollama.generation_model
        );

        Ok(Self::new(Arc::new(client.clone()), Arc::new(client))
            .with_settings(SessionSettings::from(config))
            .with_embedding_concurrency(config.ollama.concurrency as usize))
    }

    #[inline]
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackExtractor>) -> Self {
        self.fallback = fallback;
        self
    }

    #[inline]
    pub fn with_settings(self, settings: SessionSettings) -> Self {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self
    }

    /// Maximum number of embedding requests in flight while adding a document
    #[inline]
    pub fn with_embedding_concurrency(mut self, concurrency: usize) -> Self {
        self.embedding_concurrency = concurrency.max(1);
        self
    }

    /// Extract, chunk, embed and index a document
    ///
    /// Either every chunk of the document is indexed or, if any step fails,
    /// none is.
    #[inline]
    pub async fn add_document(
        &self,
        source_file: &str,
        content: &[u8],
        file_type: FileType,
    ) -> Result<IngestReport> {
        let chunking = self.settings().chunking;
        let text = extract_text(content, file_type)?;
        let chunks = chunk_document(&text, source_file, file_type, &chunking)?;

        if chunks.is_empty() {
            warn!("Document '{}' contains no text, nothing indexed", source_file);
            return Ok(IngestReport {
                source_file: source_file.to_string(),
                chunks_added: 0,
                total_documents: self.index.count(),
            });
        }

        debug!(
            "Embedding {} chunks of '{}' with concurrency {}",
            chunks.len(),
            source_file,
            self.embedding_concurrency
        );

        // buffered() yields in input order, so embeddings line up with chunks
        let embeddings: Vec<Embedding> = stream::iter(&chunks)
            .map(|chunk| self.embedder.embed(&chunk.text))
            .buffered(self.embedding_concurrency)
            .try_collect()
            .await?;

        let items = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                let metadata = EntryMetadata::for_chunk(&chunk);
                (chunk.text, embedding, metadata)
            })
            .collect();

        let ids = self.index.insert_batch(items)?;
        let total_documents = self.index.count();

        info!(
            "Added '{}' ({}): {} chunks, {} in index",
            source_file,
            file_type,
            ids.len(),
            total_documents
        );

        Ok(IngestReport {
            source_file: source_file.to_string(),
            chunks_added: ids.len(),
            total_documents,
        })
    }

    /// Read a file from disk and add it, inferring its type from the extension
    #[inline]
    pub async fn add_file(&self, path: &Path) -> Result<IngestReport> {
        let file_type = FileType::from_path(path)?;
        let content = tokio::fs::read(path).await?;
        let source_file = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

        self.add_document(&source_file, &content, file_type).await
    }

    /// Answer a question with the session's default top-K
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<QueryResponse> {
        let top_k = self.settings().top_k;
        self.ask_question(question, top_k).await
    }

    /// Answer a question from the `top_k` most similar chunks
    ///
    /// A failed or empty generation is not an error: the answer is then
    /// extracted from the context and flagged as [`AnswerSource::Fallback`].
    #[inline]
    pub async fn ask_question(&self, question: &str, top_k: usize) -> Result<QueryResponse> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be at least 1".to_string()));
        }
        if self.index.is_empty() {
            return Err(RagError::EmptyIndex);
        }

        let query = self.embedder.embed(question).await?;
        let results = self.index.search(&query, top_k)?;
        if results.is_empty() {
            return Err(RagError::NoResults);
        }

        let context = build_context(results.iter().map(|r| r.entry.text.as_str()));
        let prompt = build_prompt(&context, question);
        let max_answer_length = self.settings().max_answer_length;

        let generated = match self.generator.generate(&prompt, max_answer_length).await {
            Ok(raw) => {
                let answer = clean_answer(&raw, &prompt);
                if answer.is_empty() {
                    warn!("Generation returned an empty answer, using fallback extraction");
                    None
                } else {
                    Some(answer)
                }
            }
            Err(e) => {
                warn!("Generation failed, using fallback extraction: {}", e);
                None
            }
        };

        let (answer, answer_source) = generated.map_or_else(
            || {
                (
                    self.fallback.extract(question, &context),
                    AnswerSource::Fallback,
                )
            },
            |answer| (answer, AnswerSource::Generated),
        );

        debug!(
            "Answered from {} chunks ({:?})",
            results.len(),
            answer_source
        );

        Ok(QueryResponse {
            answer,
            context,
            relevant_documents: results.iter().map(RelevantDocument::from_result).collect(),
            answer_source,
        })
    }

    /// Drop every indexed document
    #[inline]
    pub fn clear(&self) {
        self.index.clear();
    }

    /// Number of chunks in the index
    #[inline]
    pub fn document_count(&self) -> usize {
        self.index.count()
    }

    #[inline]
    pub fn settings(&self) -> SessionSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the chunking window used for documents added from now on
    #[inline]
    pub fn set_chunking(&self, chunk_size: usize, chunk_overlap: usize) -> Result<()> {
        let chunking = ChunkingConfig {
            chunk_size,
            chunk_overlap,
        };
        chunking.validate()?;
        self.update_settings(|settings| settings.chunking = chunking);
        Ok(())
    }

    #[inline]
    pub fn set_top_k(&self, top_k: usize) -> Result<()> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be at least 1".to_string()));
        }
        self.update_settings(|settings| settings.top_k = top_k);
        Ok(())
    }

    #[inline]
    pub fn set_max_answer_length(&self, max_answer_length: u32) -> Result<()> {
        if max_answer_length == 0 {
            return Err(RagError::Config(
                "max_answer_length must be at least 1".to_string(),
            ));
        }
        self.update_settings(|settings| settings.max_answer_length = max_answer_length);
        Ok(())
    }

    #[inline]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            total_chunks: self.index.count(),
            dimension: self.index.dimension(),
            sources: self.index.sources(),
        }
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    fn update_settings(&self, update: impl FnOnce(&mut SessionSettings)) {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut settings);
        debug!("Session settings updated: {:?}", *settings);
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_LENGTH).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

fn round_similarity(similarity: f32) -> f64 {
    (f64::from(similarity) * 10_000.0).round() / 10_000.0
}
