mod commands;
mod logging;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rentwatch_core::SearchId;
use rentwatch_logging::watch_info;

use crate::commands::Services;

/// Watches rental searches and notifies about new listings with short commutes.
#[derive(Parser, Debug)]
#[command(name = "rentwatch", version, about)]
struct Cli {
    /// Also write the log to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape searches and queue listings not seen before.
    Discover {
        search_ids: Vec<SearchId>,
        /// Run every stored search.
        #[arg(long, conflicts_with = "search_ids")]
        all: bool,
    },
    /// Enrich queued listings and send notifications.
    Worker {
        /// Drain the queue once and exit.
        #[arg(long)]
        once: bool,
        /// Stop after this many events.
        #[arg(long)]
        limit: Option<usize>,
        /// Seconds to wait between polls of an empty queue.
        #[arg(long, default_value_t = 30)]
        poll_secs: u64,
    },
    /// Discover, then drain the queue once.
    Run {
        search_ids: Vec<SearchId>,
        #[arg(long, conflicts_with = "search_ids")]
        all: bool,
    },
    /// Print a stored search as RON.
    Show { search_id: SearchId },
    /// Register a new search from a RON file.
    Add { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.verbose, cli.log_file.as_deref());

    let settings = settings::load()?;
    let services = Services::open(settings)?;

    match cli.command {
        Command::Discover { search_ids, all } => {
            let ids = resolve_ids(&services, search_ids, all)?;
            services.discover(&ids).await?;
        }
        Command::Worker {
            once,
            limit,
            poll_secs,
        } => {
            if once || limit.is_some() {
                services.drain(limit).await?;
            } else {
                watch_info!("Worker started, polling every {}s", poll_secs);
                services
                    .work_forever(Duration::from_secs(poll_secs))
                    .await?;
            }
        }
        Command::Run { search_ids, all } => {
            let ids = resolve_ids(&services, search_ids, all)?;
            // Queue what was found even if some searches failed.
            let discovered = services.discover(&ids).await;
            services.drain(None).await?;
            discovered?;
        }
        Command::Show { search_id } => {
            println!("{}", services.show(search_id).await?);
        }
        Command::Add { path } => {
            let id = services.add(&path)?;
            println!("{id}");
        }
    }
    Ok(())
}

fn resolve_ids(services: &Services, ids: Vec<SearchId>, all: bool) -> Result<Vec<SearchId>> {
    if all {
        return services.all_search_ids();
    }
    if ids.is_empty() {
        bail!("no search ids given; pass ids or --all");
    }
    Ok(ids)
}
