
use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::RagError;
use crate::config::Config;
use crate::embeddings::{OllamaClient, chunk_document};
use crate::extract::{FileType, extract_text};
use crate::rag::{AnswerSource, QueryResponse, RagSession};

/// A line typed into the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Add(PathBuf),
    Clear,
    Stats,
    Help,
    Quit,
    Question(String),
    Empty,
}

impl ChatCommand {
    #[inline]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Question(line.to_string());
        }

        let (command, argument) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(command, rest)| (command, rest.trim()));

        match command {
            "/add" if !argument.is_empty() => Self::Add(PathBuf::from(argument)),
            "/clear" => Self::Clear,
            "/stats" => Self::Stats,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Help,
        }
    }
}

/// Answer a single question about the given files
#[inline]
pub async fn ask(files: &[PathBuf], question: &str, top_k: Option<usize>) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let session = open_session(&config).await?;

    ingest_files(&session, files).await?;

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let response = session
        .ask_question(question, top_k)
        .await
        .context("Failed to answer question")?;

    print_response(&response);
    Ok(())
}

/// Interactive question answering over a growing set of documents
#[inline]
pub async fn chat(files: &[PathBuf]) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let session = open_session(&config).await?;

    if !files.is_empty() {
        ingest_files(&session, files).await?;
    }

    eprintln!("{}", style("💬 Docs RAG chat").bold().cyan());
    print_chat_help();

    loop {
        let line = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt(">")
                .allow_empty(true)
                .interact_text()
        })
        .await
        .context("Prompt task failed")??;

        match ChatCommand::parse(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => print_chat_help(),
            ChatCommand::Clear => {
                session.clear();
                eprintln!("{}", style("✓ All documents removed").green());
            }
            ChatCommand::Stats => {
                let stats = session.stats();
                eprintln!("  Chunks: {}", style(stats.total_chunks).cyan());
                if let Some(dimension) = stats.dimension {
                    eprintln!("  Embedding dimension: {}", style(dimension).cyan());
                }
                for source in &stats.sources {
                    eprintln!(
                        "  📄 {} ({}, {} chunks)",
                        source.source_file, source.file_type, source.chunks
                    );
                }
            }
            ChatCommand::Add(path) => {
                if let Err(e) = ingest_files(&session, &[path]).await {
                    eprintln!("{} {:#}", style("✗").red(), e);
                }
            }
            ChatCommand::Question(question) => match session.ask(&question).await {
                Ok(response) => print_response(&response),
                Err(RagError::EmptyIndex) => {
                    eprintln!("{}", style(RagError::EmptyIndex).yellow());
                }
                Err(e) => eprintln!("{} {}", style("✗").red(), e),
            },
        }
    }

    Ok(())
}

/// Print the chunks a file would be split into with the configured window
#[inline]
pub fn chunk_preview(file: &Path) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let file_type = FileType::from_path(file)?;
    let content =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let text = extract_text(&content, file_type)?;

    let source_file = file.display().to_string();
    let chunks = chunk_document(&text, &source_file, file_type, &config.chunking)?;

    eprintln!(
        "{} {} chunks (size {}, overlap {})",
        style(&source_file).bold().cyan(),
        chunks.len(),
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    for chunk in &chunks {
        eprintln!();
        eprintln!(
            "{}",
            style(format!(
                "--- chunk {}/{} ({} chars) ---",
                chunk.chunk_index + 1,
                chunk.total_chunks,
                chunk.text.chars().count()
            ))
            .yellow()
        );
        println!("{}", chunk.text);
    }

    Ok(())
}

async fn open_session(config: &Config) -> Result<RagSession> {
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    match tokio::task::spawn_blocking(move || client.health_check()).await? {
        Ok(()) => info!("Ollama is reachable"),
        Err(e) => {
            warn!("Ollama health check failed: {:#}", e);
            eprintln!(
                "{} {:#}",
                style("⚠ Ollama is not ready, answers may fail:").yellow(),
                e
            );
        }
    }

    RagSession::from_config(config).context("Failed to create session")
}

async fn ingest_files(session: &RagSession, files: &[PathBuf]) -> Result<()> {
    let bar = if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} Indexing {msg}")
                .expect("style template is valid"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    } else {
        ProgressBar::hidden()
    };

    for path in files {
        bar.set_message(path.display().to_string());
        let report = session
            .add_file(path)
            .await
            .with_context(|| format!("Failed to add {}", path.display()))?;
        bar.suspend(|| {
            eprintln!(
                "{} {} ({} chunks, {} total)",
                style("✓").green(),
                report.source_file,
                report.chunks_added,
                report.total_documents
            );
        });
    }

    bar.finish_and_clear();
    Ok(())
}

fn print_response(response: &QueryResponse) {
    println!("{}", response.answer);

    if response.answer_source == AnswerSource::Fallback {
        eprintln!(
            "{}",
            style("(the language model was unavailable; answer extracted from the documents)")
                .yellow()
        );
    }

    eprintln!();
    eprintln!("{}", style("Sources:").bold());
    for document in &response.relevant_documents {
        eprintln!(
            "  {} {} #{} {}",
            style(format!("{:.4}", document.similarity)).cyan(),
            document.metadata.source_file,
            document.metadata.chunk_index,
            style(&document.preview).dim()
        );
    }
}

fn print_chat_help() {
    eprintln!("Type a question, or one of:");
    eprintln!("  /add <file>  index another document");
    eprintln!("  /clear       remove every document");
    eprintln!("  /stats       show what is indexed");
    eprintln!("  /quit        leave the chat");
}
