use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use mittens_application::{ChatView, SubmitError, TurnOrchestrator, TurnOutcome};
use mittens_core::chat::{MessageRole, TranscriptStore};
use mittens_core::persona;
use mittens_core::repository::KeyValueStore;
use mittens_infrastructure::{ConfigService, FileKeyValueStore, MemoryKeyValueStore, MittensPaths};
use mittens_interaction::{GeminiClient, ImagenClient, build_http_client};

mod helper;
mod render;

use helper::{CliHelper, Command};
use render::Renderer;

#[derive(Parser)]
#[command(name = "mittens")]
#[command(about = "Chat with Mittens, a sassy cat who can also draw", long_about = None)]
struct Cli {
    /// Keep the conversation in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Use this config.toml instead of ~/.config/mittens/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Logs go to a daily file so they never interleave with the prompt.
fn init_logging(log_dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(log_dir, "mittens.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

/// Prints loading status lines as the orchestrator publishes them.
fn spawn_status_watcher(mut rx: watch::Receiver<ChatView>) {
    tokio::spawn(async move {
        let mut last: Option<String> = None;
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().loading_status_text.clone();
            if status != last {
                if let Some(text) = &status {
                    println!("{}", text.yellow().italic());
                }
                last = status;
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ===== Backend Initialization =====
    let paths = MittensPaths::resolve()?;
    let _log_guard = init_logging(&paths.log_dir());

    let mut config_service = ConfigService::new(paths.clone());
    if let Some(path) = cli.config {
        config_service = config_service.with_config_path(path);
    }
    let config = config_service.load_config()?;
    let api_key = config_service.resolve_api_key()?;

    let http = build_http_client(&config)?;
    let chat = Arc::new(GeminiClient::new(http.clone(), &config, api_key.clone()));
    let images = Arc::new(ImagenClient::new(http, &config, api_key));
    let store: Arc<dyn KeyValueStore> = if cli.ephemeral {
        Arc::new(MemoryKeyValueStore::new())
    } else {
        Arc::new(FileKeyValueStore::new(paths.store_dir()))
    };
    let orchestrator = TurnOrchestrator::new(chat, images, TranscriptStore::new(store));
    let renderer = Renderer::new(paths.image_dir());
    tracing::info!(
        chat_model = %config.chat_model,
        image_model = %config.image_model,
        ephemeral = cli.ephemeral,
        image_dir = %renderer.image_dir().display(),
        "Mittens started"
    );

    spawn_status_watcher(orchestrator.subscribe());

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    println!("{}", format!("=== {} ===", persona::NAME).bright_magenta().bold());
    println!(
        "{}",
        "Type a message, '/new' to start over, '/history' to replay the chat, or '/quit' to exit."
            .bright_black()
    );
    println!();
    renderer.print_transcript(orchestrator.view().transcript.messages());

    // ===== Main REPL Loop =====
    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        match Command::parse(trimmed) {
            Some(Command::Quit) => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Some(Command::New) => {
                orchestrator.reset().await;
                println!("{}", "Started a new chat.".bright_black());
                renderer.print_transcript(orchestrator.view().transcript.messages());
                continue;
            }
            Some(Command::History) => {
                renderer.print_transcript(orchestrator.view().transcript.messages());
                continue;
            }
            None => {}
        }

        let before = orchestrator.view().transcript.len();
        match orchestrator.submit(&line).await {
            Ok(TurnOutcome::Discarded) => {}
            Ok(outcome) => {
                tracing::debug!(?outcome, "Turn complete");
                let transcript = orchestrator.transcript().await;
                for message in transcript.messages().iter().skip(before) {
                    if message.role == MessageRole::Model {
                        renderer.print_message(message, true);
                    }
                }
            }
            Err(SubmitError::EmptyInput) => {}
            Err(e) => eprintln!("{}", format!("{e}").red()),
        }
    }

    Ok(())
}
