//! sitemind - learning knowledge store and self-healing task executor
//!
//! Operator CLI over the configured knowledge store.

mod cli;
mod cmd_config;
mod cmd_store;

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sitemind_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use sitemind_knowledge_sqlite::SqliteKnowledgeStore;

use cli::{Cli, Commands};
use cmd_config::handle_config_command;
use cmd_store::{handle_session_command, handle_store_command};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing with console output and, when a log directory is
/// configured, a daily-rotated file.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match logging.resolved_directory() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("sitemind")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // Console output goes to stderr; stdout carries command results.
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<SqliteKnowledgeStore> {
    let store = match config.store.resolved_path() {
        Some(path) => {
            debug!("Opening knowledge store at {}", path.display());
            SqliteKnowledgeStore::open(&path)
                .await
                .with_context(|| format!("opening knowledge store {}", path.display()))?
        }
        None => {
            warn!("Using an in-memory knowledge store; nothing will persist");
            SqliteKnowledgeStore::in_memory().await?
        }
    };
    Ok(store.with_cache_ttl(config.store.cache_ttl()))
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    ConfigLoader::load_or_default(path)
        .with_context(|| format!("loading configuration from {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(ConfigLoader::default_path);
    let config = load_config(&config_path)?;
    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Config { action } => handle_config_command(action, &config_path, &config),
        command => {
            let validation = ConfigValidator::validate(&config);
            for warning in &validation.warnings {
                warn!("{}: {}", warning.path, warning.message);
            }
            if let Some(e) = validation.into_error() {
                return Err(e).context("invalid configuration");
            }

            let store = open_store(&config).await?;
            match command {
                Commands::Sessions { action } => handle_session_command(action, &store).await,
                command => handle_store_command(command, &store).await,
            }
        }
    }
}
