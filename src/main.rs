use anyhow::Result;
use clap::{Parser, Subcommand};
use docs_rag::commands::{ask, chat, chunk_preview};
use docs_rag::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Ask questions about local documents using an Ollama server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index the given files and answer one question about them
    Ask {
        /// Document to index (txt, md, html, csv or json); repeat for several
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,
        /// Number of document sections used as context
        #[arg(long)]
        top_k: Option<usize>,
        /// The question to answer
        question: String,
    },
    /// Start an interactive question-answering session
    Chat {
        /// Documents to index before the first question
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,
    },
    /// Show how a file would be split into chunks
    Chunk {
        /// File to split
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ask {
            files,
            top_k,
            question,
        } => {
            ask(&files, &question, top_k).await?;
        }
        Commands::Chat { files } => {
            chat(&files).await?;
        }
        Commands::Chunk { file } => {
            chunk_preview(&file)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn ask_command_with_files() {
        let cli = Cli::try_parse_from([
            "docs-rag",
            "ask",
            "--file",
            "a.txt",
            "-f",
            "b.md",
            "What is covered?",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                files,
                top_k,
                question,
            } = parsed.command
            {
                assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.md")]);
                assert_eq!(top_k, None);
                assert_eq!(question, "What is covered?");
            } else {
                panic!("expected ask command");
            }
        }
    }

    #[test]
    fn ask_command_with_top_k() {
        let cli = Cli::try_parse_from([
            "docs-rag", "ask", "-f", "a.txt", "--top-k", "5", "Who signed?",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { top_k, .. } = parsed.command {
                assert_eq!(top_k, Some(5));
            }
        }
    }

    #[test]
    fn ask_requires_a_file() {
        let cli = Cli::try_parse_from(["docs-rag", "ask", "What is covered?"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn chat_files_are_optional() {
        let cli = Cli::try_parse_from(["docs-rag", "chat"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chat { files } = parsed.command {
                assert!(files.is_empty());
            }
        }
    }

    #[test]
    fn chunk_command() {
        let cli = Cli::try_parse_from(["docs-rag", "chunk", "notes.md"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chunk { file } = parsed.command {
                assert_eq!(file, PathBuf::from("notes.md"));
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["docs-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["docs-rag", "serve"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["docs-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
