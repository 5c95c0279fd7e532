//! # Rule Profiler CLI (`rprof`)
//!
//! ## Usage
//!
//! ```bash
//! rprof --config ./config/profiler.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rprof init` | Create the SQLite database and run schema migrations |
//! | `rprof serve` | Start the HTTP API |
//! | `rprof extract <path>` | Print the text extracted from an instructions file |
//!
//! ## Examples
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! export JWT_SECRET=$(openssl rand -hex 32)
//! rprof init --config ./config/profiler.toml
//! RUST_LOG=rule_profiler=debug rprof serve --config ./config/profiler.toml
//! rprof extract ./instructions.pdf
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rule_profiler::{config, extract, migrate, server};

/// Derive validation rules from regulatory instructions and profile CSV data against them.
#[derive(Parser)]
#[command(name = "rprof", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/profiler.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP API on `[server].bind`.
    ///
    /// Needs the JWT secret (and, for the openai provider, the API key) in
    /// the environment variables named in `[auth]` and `[llm]`.
    Serve,

    /// Extract and print the text of a document, as the upload flow would.
    Extract {
        /// File to read.
        path: PathBuf,

        /// MIME type; guessed from the extension when omitted.
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Extraction works on a bare file and needs no config.
    if let Commands::Extract { path, content_type } = &cli.command {
        let name = path.to_string_lossy();
        let content_type = match content_type {
            Some(ct) => ct.clone(),
            None => extract::content_type_for_name(&name)
                .with_context(|| format!("cannot guess content type of {}; pass --content-type", name))?
                .to_string(),
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", name))?;
        let text = extract::extract_text(&bytes, &content_type)
            .with_context(|| format!("failed to extract text from {}", name))?;
        println!("{}", text);
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Extract { .. } => {}
    }

    Ok(())
}
