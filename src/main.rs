//! List-Eater main entry point
//!
//! This is the command-line interface for the List-Eater listing crawler.

use anyhow::Context;
use clap::Parser;
use list_eater::config::{load_config_with_hash, Config};
use list_eater::crawler::{CrawlResult, ListEater, ResultSink, SelectorExtractor};
use list_eater::observe::{CrawlStats, FanoutObserver, TracingObserver};
use list_eater::Credentials;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// List-Eater: crawl a paginated listing and extract every item
///
/// Logs in if the configuration has a [login] section, walks every list
/// page, and prints one JSON object per extracted item to stdout.
#[derive(Parser, Debug)]
#[command(name = "list-eater")]
#[command(version)]
#[command(about = "Crawl a paginated listing and extract every item", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// User name for the login form
    #[arg(short, long)]
    user: Option<String>,

    /// Password for the login form
    #[arg(long, env = "LIST_EATER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Number of results buffered before the crawl waits for output
    #[arg(long, default_value_t = 64)]
    buffer: usize,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&cli, &config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("list_eater=info,warn"),
            1 => EnvFilter::new("list_eater=debug,info"),
            2 => EnvFilter::new("list_eater=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr, stdout carries the extracted items
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== List-Eater Dry Run ===\n");

    match &config.login {
        Some(login) => {
            println!("Login:");
            println!("  URL: {}", login.url);
            println!("  User field: {}", login.user_field);
            println!("  Password field: {}", login.password_field);
        }
        None => println!("Login: none (anonymous crawl)"),
    }

    if let Some(crawl) = &config.crawl {
        println!("\nCrawl:");
        println!("  Start URL: {}", crawl.list_url);
        println!("  Element selector: {}", crawl.element);
        match &crawl.pagination {
            Some(selector) => println!("  Pagination selector: {}", selector),
            None => println!("  Pagination: rel=\"next\" links"),
        }
    }

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);

    println!("\nExtracted fields:");
    if config.extract.fields.is_empty() {
        println!("  title = title");
    }
    for (field, selector) in &config.extract.fields {
        println!("  {} = {}", field, selector);
    }
}

/// Runs the crawl, printing items as they arrive
async fn handle_crawl(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let credentials = match (&cli.user, &cli.password) {
        (Some(user), Some(password)) => Some(Credentials::new(user.clone(), password.clone())),
        (Some(_), None) => anyhow::bail!("--user given without a password"),
        _ => None,
    };

    let extractor = Arc::new(SelectorExtractor::from_config(&config.extract)?);

    let stats = Arc::new(CrawlStats::default());
    let mut observer = FanoutObserver::default();
    observer.push(Arc::new(TracingObserver));
    observer.push(stats.clone());

    let eater = ListEater::from_config(config).with_observer(observer);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            interrupt.cancel();
        }
    });

    let (sink, mut results) = ResultSink::channel(cli.buffer);

    let consume = async {
        let mut extracted = 0u64;
        let mut failed = 0u64;
        while let Some(result) = results.recv().await {
            match result {
                CrawlResult::Element(item) => match serde_json::to_string(&item) {
                    Ok(line) => {
                        extracted += 1;
                        println!("{}", line);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::warn!("Failed to serialize extracted item: {}", e);
                    }
                },
                CrawlResult::Error(error) => {
                    failed += 1;
                    tracing::warn!("{}", error);
                }
                CrawlResult::Done => break,
            }
        }
        (extracted, failed)
    };

    let (outcome, (extracted, failed)) = tokio::join!(
        eater.crawl_with_cancel(sink, extractor, credentials.as_ref(), cancel),
        consume
    );

    eprintln!("\n=== Crawl Summary ===");
    eprintln!("{}", stats.snapshot());
    eprintln!("Items extracted:    {}", extracted);
    eprintln!("Item errors:        {}", failed);

    outcome.context("crawl aborted")?;
    Ok(())
}
