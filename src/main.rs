//! # mediagrab CLI
//!
//! Command-line interface for the mediagrab library.
//! Searches several media platforms at once and downloads what you pick.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use log::error;
use mediagrab::{
    http_client, resolve_sources, select_interactive, select_per_source, Aggregator, Credentials,
    DownloadOptions, Downloader, MediaTypeFilter, Query, SearchReport, SourceConfig, DEFAULT_LIMIT,
};

mod cli;

/// Command-line interface for mediagrab
#[derive(Parser, Debug)]
#[command(name = "mediagrab")]
#[command(about = "Search several media platforms at once and download what you pick")]
#[command(long_about = "Searches media platforms concurrently and downloads the results:
  mediagrab cats                          # Search Giphy, download up to 5 items
  mediagrab cats -p giphy wikimedia -t gif
  mediagrab \"good news\" -p morbotron -i   # Pick items interactively
  mediagrab ocean -p pixabay --dry-run    # Only list what was found

Files land in <output-dir>/<query>/<platform>/. Existing files are never
overwritten; a numeric suffix is added instead.

Credentials are read from GIPHY_API_KEY, PIXABAY_API_KEY and
WIKIMEDIA_ACCESS_TOKEN.")]
#[command(version = env!("MEDIAGRAB_VERSION"))]
struct Cli {
    /// Search text
    #[arg(required_unless_present = "list_sources")]
    query: Option<String>,

    /// Platforms to search (see --list-sources)
    #[arg(short, long, num_args = 1.., default_value = "giphy")]
    platforms: Vec<String>,

    /// Media type: all, image, gif, video, audio or sticker
    #[arg(short = 't', long, default_value = "all")]
    media_type: MediaTypeFilter,

    /// Maximum items per platform
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Root directory for downloads
    #[arg(short, long, default_value = "downloaded")]
    output_dir: PathBuf,

    /// Seconds to wait for each platform's search answer
    #[arg(long, default_value_t = 10)]
    api_timeout: u64,

    /// Seconds allowed per download attempt (platform default when absent)
    #[arg(long)]
    download_timeout: Option<u64>,

    /// Choose items from a numbered list instead of downloading all of them
    #[arg(short, long)]
    interactive: bool,

    /// Search and list only, download nothing
    #[arg(long)]
    dry_run: bool,

    /// Print the found items as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List supported platforms and exit
    #[arg(long)]
    list_sources: bool,
}

impl Cli {
    fn to_query(&self) -> anyhow::Result<Query> {
        let text = self.query.clone().unwrap_or_default();
        let query = Query::new(text)?
            .with_media_type(self.media_type)
            .with_limit(self.limit)
            .with_api_timeout(Duration::from_secs(self.api_timeout.max(1)))
            .with_download_timeout(self.download_timeout.map(Duration::from_secs));
        Ok(query)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_module("mediagrab", log::LevelFilter::Debug);
    }
    logger.target(env_logger::Target::Stderr).init();

    if cli.verbose {
        eprintln!("🔎 mediagrab v{} starting...", env!("MEDIAGRAB_VERSION"));
    }

    if cli.list_sources {
        cli::report::write_sources(&mut io::stdout())?;
        return Ok(());
    }

    let query = cli.to_query()?;
    let client = http_client()?;
    let adapters = resolve_sources(&cli.platforms, &SourceConfig::default(), &client)?;
    let aggregator = Aggregator::new(Credentials::from_env());

    let names: Vec<&str> = adapters.iter().map(|a| a.id()).collect();
    eprintln!("🌐 Searching {} for '{}'", names.join(", "), query.text());

    let outcomes = tokio::select! {
        outcomes = aggregator.search(&query, &adapters) => outcomes,
        _ = tokio::signal::ctrl_c() => bail!("search cancelled"),
    };
    let report = SearchReport::build(&query, outcomes);
    cli::report::write_statuses(&mut io::stderr(), &report)?;

    let mut stdout = io::stdout();
    if cli.json {
        serde_json::to_writer_pretty(&mut stdout, &report.items).context("writing JSON")?;
        writeln!(stdout)?;
    } else if !cli.interactive || cli.dry_run {
        cli::report::write_items(&mut stdout, &report.items)?;
    }

    if cli.dry_run {
        eprintln!("🔍 [DRY RUN] {} item(s) found, nothing downloaded", report.items.len());
        return Ok(());
    }

    let selected = if cli.interactive {
        let stdin = io::stdin();
        select_interactive(&report.items, &mut stdin.lock(), &mut stdout)?
    } else {
        select_per_source(&report.items, query.limit())
    };
    if selected.is_empty() {
        eprintln!("📭 Nothing to download");
        return Ok(());
    }

    let progress = cli::ProgressManager::new(
        selected.len() as u64,
        &format!("📁 Saving {} item(s) under {}", selected.len(), cli.output_dir.display()),
    );
    let options = DownloadOptions {
        progress: Some(progress.callback()),
        source_timeouts: adapters
            .iter()
            .map(|a| (a.id().to_string(), a.default_download_timeout()))
            .collect(),
        ..Default::default()
    };
    let downloader = Downloader::with_client(client, options);

    let results = tokio::select! {
        results = downloader.download_all(&selected, &cli.output_dir, query.text(), query.download_timeout()) => results,
        _ = tokio::signal::ctrl_c() => {
            progress.pb.abandon();
            bail!("download cancelled");
        }
    };
    cli::report::write_results(&mut stdout, &results)?;

    Ok(())
}
