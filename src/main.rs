//! # Pagecheck CLI (`pagecheck`)
//!
//! Runs the page server and drives pages and fact-checks from the shell.
//!
//! ## Usage
//!
//! ```bash
//! pagecheck --config ./config/pagecheck.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pagecheck init` | Create the SQLite database and run schema migrations |
//! | `pagecheck serve` | Start the page store HTTP server |
//! | `pagecheck page create` | Create a page from JSON content |
//! | `pagecheck page get <id>` | Print a page |
//! | `pagecheck page update <id>` | Replace a page's content |
//! | `pagecheck page delete <id>` | Delete a page |
//! | `pagecheck check "<text>"` | Fact-check a piece of text |
//! | `pagecheck annotate <id> "<text>"` | Fact-check text and save it as an annotation on a page |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).
//! A `.env` file in the working directory is loaded before the config.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pagecheck::{check_cmd, config, migrate, page_cmd, server};

/// Pagecheck: a page editor backend with fact-check annotations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pagecheck.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pagecheck",
    about = "Pagecheck, a page store and fact-check annotation service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pagecheck.toml`. A missing file means defaults.
    #[arg(long, global = true, default_value = "./config/pagecheck.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the page store HTTP server.
    ///
    /// Serves `/api/pages`, `/api/fact-check` and `/health` on `[server].bind`,
    /// plus the static frontend when `[server].static_dir` is set.
    Serve,

    /// Page operations against a running server (`[client].base_url`).
    Page {
        #[command(subcommand)]
        action: PageAction,
    },

    /// Fact-check a piece of text with the configured checker.
    Check {
        /// Text to check.
        text: String,
    },

    /// Load a page, fact-check `text`, and save the result as an annotation.
    Annotate {
        /// Page UUID.
        id: String,
        /// Selected text to check.
        text: String,
    },
}

#[derive(Subcommand)]
enum PageAction {
    /// Create a page.
    Create {
        /// Content as a JSON string.
        #[arg(long)]
        content: Option<String>,
        /// Read content JSON from a file.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print a page as JSON.
    Get { id: String },
    /// Replace a page's content.
    Update {
        id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete a page.
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Page { action } => match action {
            PageAction::Create { content, file } => {
                let content = page_cmd::read_content(content.as_deref(), file.as_deref())?;
                page_cmd::run_create(&cfg, content).await?;
            }
            PageAction::Get { id } => {
                page_cmd::run_get(&cfg, &id).await?;
            }
            PageAction::Update { id, content, file } => {
                let content = page_cmd::read_content(content.as_deref(), file.as_deref())?;
                page_cmd::run_update(&cfg, &id, content).await?;
            }
            PageAction::Delete { id } => {
                page_cmd::run_delete(&cfg, &id).await?;
            }
        },
        Commands::Check { text } => {
            check_cmd::run_check(&cfg, &text).await?;
        }
        Commands::Annotate { id, text } => {
            check_cmd::run_annotate(&cfg, &id, &text).await?;
        }
    }

    Ok(())
}
