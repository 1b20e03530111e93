//! lexcrawl CLI
//!
//! Local execution entry point for the legal-document crawler.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lexcrawl::{
    error::Result,
    models::Config,
    pipeline::{self, CheckpointStore, CrawlOptions},
    storage::LocalStorage,
};

/// lexcrawl - Legal Document Repository Crawler
#[derive(Parser, Debug)]
#[command(
    name = "lexcrawl",
    version,
    about = "Resumable crawler for a paginated legal-document repository"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "lexcrawl.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the configured partitions
    Crawl {
        /// Continue from the saved checkpoint
        #[arg(long)]
        resume: bool,

        /// Discard the checkpoint and refetch already stored documents
        #[arg(long, conflicts_with = "resume")]
        clean: bool,

        /// Interface language code, overriding the config file
        #[arg(long)]
        lang: Option<String>,

        /// Year filter, repeatable; overrides the config file
        #[arg(long)]
        year: Vec<String>,

        /// Category filter, repeatable; overrides the config file
        #[arg(long)]
        category: Vec<String>,

        /// Document worker pool size, overriding the config file
        #[arg(long)]
        workers: Option<usize>,

        /// Also save raw page HTML, gzipped
        #[arg(long)]
        save_html: bool,

        /// Output directory, overriding the config file
        #[arg(long)]
        target_dir: Option<String>,
    },

    /// Validate the configuration file
    Validate,

    /// Show checkpoint state for the configured language
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Crawl {
            resume,
            clean,
            lang,
            year,
            category,
            workers,
            save_html,
            target_dir,
        } => {
            if let Some(lang) = lang {
                config.filters.language = lang;
            }
            if !year.is_empty() {
                config.filters.years = year;
            }
            if !category.is_empty() {
                config.filters.categories = category;
            }
            if let Some(workers) = workers {
                config.crawler.workers = workers;
            }
            if save_html {
                config.output.save_html = true;
            }
            if let Some(target_dir) = target_dir {
                config.output.target_dir = target_dir;
            }
            config.validate()?;

            let storage = LocalStorage::new(&config.output.target_dir);
            let options = CrawlOptions { resume, clean };

            let summary = pipeline::run_crawl(&config, &storage, &options).await?;
            log::info!(
                "Crawl complete: {} stored, {} skipped, {} failed",
                summary.stored(),
                summary.skipped(),
                summary.failed()
            );
        }

        Command::Validate => {
            log::info!("Validating configuration from {}", cli.config.display());
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }

        Command::Info => {
            let dir = PathBuf::from(&config.output.target_dir).join(&config.filters.language);
            let store = CheckpointStore::new(&dir);
            log::info!("Checkpoint file: {}", store.path().display());

            match store.load().await? {
                Some(checkpoint) => {
                    log::info!("Last updated: {}", checkpoint.updated_at);
                    log::info!("Completed partitions: {}", checkpoint.completed.len());
                    match &checkpoint.current {
                        Some(progress) => log::info!(
                            "In flight: {} at page {} ({} ids processed)",
                            progress.partition,
                            progress.cursor.index,
                            progress.processed.len()
                        ),
                        None => log::info!("No partition in flight"),
                    }
                }
                None => log::info!("No checkpoint found yet."),
            }
        }
    }

    Ok(())
}
