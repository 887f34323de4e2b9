//! `chatdoc`: ask questions about a document from the terminal.
//!
//! ```text
//! chatdoc -f paper.pdf -t "What does this paper mainly talk about?"
//! chatdoc -f notes.html            # interactive, type `exit` to quit
//! chatdoc -t "Why is the sky blue?" # no document: ask the model directly
//! ```

mod cli;

use std::sync::Arc;

use anyhow::Context;
use chatdoc::ollama::OllamaClient;
use chatdoc::{ChatSession, LanguageModel};
use clap::Parser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const DOCUMENT_PROMPT: &str = "Ask a question about the document: ";
const CHAT_PROMPT: &str = "Enter your question: ";

/// Where questions go: the loaded document, or straight to the model.
enum Responder {
    Document(ChatSession),
    Chat(Arc<OllamaClient>),
}

impl Responder {
    async fn answer(&self, question: &str) -> chatdoc::Result<String> {
        match self {
            Self::Document(session) => session.ask(question).await,
            Self::Chat(model) => model.generate(question).await,
        }
    }

    fn prompt(&self) -> &'static str {
        match self {
            Self::Document(_) => DOCUMENT_PROMPT,
            Self::Chat(_) => CHAT_PROMPT,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so answers on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    let ollama = Arc::new(OllamaClient::from_config(&config)?);

    let mut responder = match &cli.file {
        Some(path) => {
            let mut session = ChatSession::builder()
                .config(config)
                .embedding_provider(ollama.clone())
                .language_model(ollama)
                .build()?;

            let summary = session
                .ingest_file(path)
                .await
                .with_context(|| format!("failed to ingest {}", path.display()))?;
            tracing::info!(chunk_count = summary.chunk_count, "document ready");
            Responder::Document(session)
        }
        None => Responder::Chat(ollama),
    };

    let outcome = match &cli.text {
        Some(question) => {
            ask(&responder, question).await;
            Ok(())
        }
        None => interactive(&responder).await,
    };

    if let Responder::Document(session) = &mut responder {
        session.clear();
    }
    outcome
}

async fn ask(responder: &Responder, question: &str) {
    match responder.answer(question).await {
        Ok(answer) => println!("Answer: {answer}"),
        Err(e) => eprintln!("Error during query processing: {e}"),
    }
}

async fn interactive(responder: &Responder) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    match responder {
        Responder::Document(_) => println!("Document mode: type 'exit' to quit."),
        Responder::Chat(_) => println!("Chat mode: type 'exit' to quit."),
    }

    loop {
        match editor.readline(responder.prompt()) {
            Ok(line) => {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if question.eq_ignore_ascii_case("exit") {
                    break;
                }
                let _ = editor.add_history_entry(question);
                ask(responder, question).await;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
