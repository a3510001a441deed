// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deskline - live support desk coordination.
//!
//! This is the binary entry point. Every subcommand opens the configured
//! SQLite store and media root, runs one desk operation, and exits.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use deskline_config::DesklineConfig;
use deskline_engine::{Desk, DeskSettings};
use deskline_storage::{FsBlobStore, SqliteStore};
use tracing::debug;

/// Deskline - live support desk coordination.
#[derive(Parser, Debug)]
#[command(name = "deskline", version, about, long_about = None)]
struct Cli {
    /// Configuration file, instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Identifier of the agent issuing the command.
    #[arg(long, global = true, env = "DESKLINE_AGENT")]
    agent: Option<String>,

    /// Email of the agent issuing the command.
    #[arg(long, global = true, env = "DESKLINE_EMAIL")]
    email: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Narrowing for the queue projections.
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Only conversations with this service option.
    #[arg(long)]
    service_option: Option<String>,
    /// Only conversations from this region.
    #[arg(long)]
    region: Option<String>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a conversation for a customer, awaiting intake.
    Open {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        name: String,
    },
    /// Submit intake data (JSON) and queue the conversation.
    Intake { conversation: String, data: String },
    /// List waiting conversations, oldest first.
    Queue(FilterArgs),
    /// List active conversations, most recent activity first.
    Active {
        /// Only conversations owned by or shared with the calling agent.
        #[arg(long)]
        mine: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Take ownership of a waiting conversation.
    Claim { conversation: String },
    /// Grant another agent (id or email) access to a conversation you own.
    Share { conversation: String, grantee: String },
    /// Send a text message.
    Send { conversation: String, text: String },
    /// Upload a file to the media root and send it.
    Attach {
        conversation: String,
        file: PathBuf,
        /// MIME type; decides whether the file is an image, video, or audio.
        #[arg(long, default_value = "image/jpeg")]
        mime: String,
    },
    /// Warn the customer that the conversation is about to close.
    Warn { conversation: String },
    /// Replace the intake data (JSON) of an active conversation.
    EditIntake { conversation: String, data: String },
    /// Close a conversation you own, purging its media.
    Close {
        conversation: String,
        /// Whether communication was restored (e.g. SIM / NAO).
        #[arg(long)]
        communication_status: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Print a conversation's message log.
    Log {
        conversation: String,
        /// Only entries after this position.
        #[arg(long)]
        after: Option<u64>,
    },
    /// Print the queue and active cohorts whenever they change, until interrupted.
    Watch {
        #[arg(long)]
        mine: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => deskline_config::load_and_validate_path(path),
        None => deskline_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            deskline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.desk.log_level);
    debug!(desk = %config.desk.name, "config loaded");

    let media = Arc::new(FsBlobStore::new(&config.media));
    let desk = match open_desk(&config, media.clone()).await {
        Ok(desk) => desk,
        Err(e) => {
            eprintln!("deskline: cannot open storage: {e}");
            std::process::exit(1);
        }
    };

    let result = commands::run(&desk, &media, &cli).await;
    if let Err(e) = desk.shutdown().await {
        debug!(error = %e, "shutdown incomplete");
    }
    if let Err(e) = result {
        debug!(error = %e, "command failed");
        eprintln!("deskline: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn open_desk(
    config: &DesklineConfig,
    media: Arc<FsBlobStore>,
) -> Result<Desk, deskline_core::DesklineError> {
    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    Ok(Desk::new(Arc::new(store), media, DeskSettings::from(config)))
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deskline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
