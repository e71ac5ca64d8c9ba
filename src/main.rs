//! NewsBot terminal client
//!
//! Keeps a chat transcript in sync with the remote conversation service and
//! persists the session id across restarts.

mod config;
mod history;
mod remote;
mod runtime;
mod session;
mod state_machine;
mod terminal;

use config::ClientConfig;
use remote::{HttpConversationService, LoggingService};
use session::{SessionStore, SqliteKeyValueStore};
use std::sync::Arc;
use terminal::{Command, HELP_TEXT};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsbot=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env();

    if let Some(parent) = config.state_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.state_path.display(), "Opening client state");
    let storage = Arc::new(SqliteKeyValueStore::open(&config.state_path)?);

    tracing::info!(api_url = %config.api_url, "Using conversation service");
    let service = Arc::new(LoggingService::new(Arc::new(HttpConversationService::new(
        &config.api_url,
        config.request_timeout,
    ))));

    let (handle, runtime_task) = runtime::start(service, SessionStore::new(storage));
    let render_task = tokio::spawn(terminal::render_loop(handle.subscribe()));

    println!("NewsBot - your AI assistant for the latest news. {HELP_TEXT}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let result = match Command::parse(&line) {
            Command::Send(text) => handle.send(text).await,
            Command::NewSession => handle.reset_session().await,
            Command::Reload => handle.reload_history().await,
            Command::ShowSession => {
                println!("Session ID: {}", handle.snapshot().session_id);
                Ok(())
            }
            Command::ShowHistory => {
                for line in terminal::format_transcript(&handle.snapshot()) {
                    println!("{line}");
                }
                Ok(())
            }
            Command::Help => {
                println!("{HELP_TEXT}");
                Ok(())
            }
            Command::Unknown(cmd) => {
                println!("Unknown command {cmd}. {HELP_TEXT}");
                Ok(())
            }
            Command::Quit => break,
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "Conversation runtime is gone");
            break;
        }
    }

    handle.shutdown();
    runtime_task.await?;
    render_task.abort();

    Ok(())
}
