mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use mindcache::annotations::AnnotationKind;
use mindcache::config::MindCacheConfig;
use mindcache::tracking::log::InteractionFilter;
use mindcache::tracking::types::InteractionKind;

#[derive(Parser)]
#[command(name = "mindcache", version, about = "Browsing-interaction tracker and page annotation store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background service and its HTTP surface
    Serve,
    /// Show activity statistics
    Stats {
        #[arg(long)]
        domain: Option<String>,
    },
    /// Show annotation counts
    Counts {
        #[arg(long)]
        domain: Option<String>,
    },
    /// Export annotations as JSON to stdout
    Export {
        #[arg(long)]
        domain: Option<String>,
    },
    /// Back up interactions, summaries, and settings as JSON to stdout
    Backup,
    /// Restore a backup or merge an annotation export
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Query the interaction log
    Interactions {
        #[arg(long = "type")]
        kind: Option<InteractionKind>,
        /// Hostname substring
        #[arg(long)]
        domain: Option<String>,
        /// Inclusive lower bound, epoch ms
        #[arg(long)]
        since: Option<i64>,
        /// Inclusive upper bound, epoch ms
        #[arg(long)]
        until: Option<i64>,
        /// Keep only the most recent N matches
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show recent summaries
    Summaries {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete highlights, notes, or quotes
    Clear {
        kind: AnnotationKind,
        #[arg(long)]
        domain: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Check storage health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = MindCacheConfig::load()?;

    // Log to stderr so stdout stays clean for exports.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => mindcache::server::serve(config).await?,
        Command::Stats { domain } => cli::stats::stats(&config, domain.as_deref()).await?,
        Command::Counts { domain } => cli::counts::counts(&config, domain.as_deref()).await?,
        Command::Export { domain } => cli::export::export(&config, domain.as_deref()).await?,
        Command::Backup => cli::backup::backup(&config).await?,
        Command::Import { file } => cli::import::import(&config, &file).await?,
        Command::Interactions {
            kind,
            domain,
            since,
            until,
            limit,
        } => {
            let filter = InteractionFilter {
                start_date: since,
                end_date: until,
                kind,
                domain,
                limit,
            };
            cli::interactions::interactions(&config, &filter).await?
        }
        Command::Summaries { limit } => cli::summaries::summaries(&config, limit).await?,
        Command::Clear { kind, domain, yes } => {
            cli::clear::clear(&config, kind, domain.as_deref(), yes).await?
        }
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
