//! Command-line front end
//!
//! - `serve`: REST server
//! - `ask`: answer one question and exit
//! - `chat`: interactive conversation
//! - `warm`: pre-warm the cache with common questions
//! - `cache`: inspect or clear the persisted cache

pub mod ask;
pub mod cache;
pub mod chat;
pub mod serve;
pub mod warm;

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Agenda Assistant - ask questions about your contacts in plain language
#[derive(Parser)]
#[command(name = "agenda-assistant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the REST server
    Serve,

    /// Answer a single question
    Ask {
        /// The question, e.g. "¿Cuál es el teléfono de Luis Pérez?"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Interactive conversation with session context
    Chat,

    /// Pre-warm the cache with common questions
    Warm(warm::WarmArgs),

    /// Inspect or clear the persisted cache
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommand,
    },
}

/// Load `.env`, then the layered configuration
pub fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::load().context("Failed to load configuration")
}

/// Console logging for the non-server commands
pub fn init_console_logging(config: &AppConfig) {
    logging::init_logging(&config.logging);
}

/// Read questions from a file, one per line. Blank lines and `#` comments are skipped.
pub async fn read_queries(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
