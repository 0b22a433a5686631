//! docsearch main entry point
//!
//! This is the command-line interface for crawling a documentation site into
//! the search index and querying it.

use clap::{Parser, Subcommand};
use docsearch::config::{load_config_with_hash, Config};
use docsearch::crawler::{build_http_client, discover_targets, run_crawl, Coordinator};
use docsearch::output::{generate_markdown_summary, print_report};
use docsearch::search::{clamp_page, EngineClient, ResultCache, SearchService};
use docsearch::storage::{open_storage, ArticleSink, ArticleStore, RunStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// docsearch: documentation crawler and search
///
/// docsearch crawls a help-center site through its sitemap, indexes the
/// articles into an Elasticsearch-compatible engine, and answers ranked,
/// cached searches against that index.
#[derive(Parser, Debug)]
#[command(name = "docsearch")]
#[command(version = "1.0.0")]
#[command(about = "Documentation crawler and search", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the sitemap (or the given URLs) and store the articles
    Crawl {
        /// Crawl these article URLs instead of the sitemap
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// Do not write articles to the search index
        #[arg(long)]
        no_index: bool,

        /// Write a markdown summary of the crawl to this path
        #[arg(long, value_name = "PATH")]
        summary: Option<PathBuf>,

        /// Resolve the targets and show what would be crawled without fetching
        #[arg(long)]
        dry_run: bool,
    },

    /// Search the index
    Search {
        /// Query text; wrap in double quotes for an exact phrase
        query: String,

        /// Index of the first result
        #[arg(long, default_value_t = 0)]
        from: usize,

        /// Results per page (1-50)
        #[arg(long, default_value_t = 10)]
        size: usize,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Suggest article titles for a prefix
    Suggest {
        /// The typed prefix (at least two characters)
        prefix: String,
    },

    /// Validate the configuration and print it
    CheckConfig,

    /// Show the most recent crawl run from the article database
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Crawl {
            urls,
            no_index,
            summary,
            dry_run,
        } => {
            handle_crawl(
                &config,
                &config_hash,
                CrawlOptions {
                    urls,
                    no_index,
                    summary,
                    dry_run,
                },
            )
            .await?
        }
        Command::Search {
            query,
            from,
            size,
            json,
        } => handle_search(&config, &query, from, size, json).await?,
        Command::Suggest { prefix } => handle_suggest(&config, &prefix).await?,
        Command::CheckConfig => handle_check_config(&config, &config_hash),
        Command::Stats => handle_stats(&config)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docsearch=info,warn"),
            1 => EnvFilter::new("docsearch=debug,info"),
            2 => EnvFilter::new("docsearch=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

struct CrawlOptions {
    urls: Vec<String>,
    no_index: bool,
    summary: Option<PathBuf>,
    dry_run: bool,
}

/// Handles the crawl command
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    options: CrawlOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let targets = if !options.urls.is_empty() {
        options.urls
    } else if let Some(sitemap) = &config.sitemap {
        let client = build_http_client(&config.crawler)?;
        discover_targets(&client, sitemap).await?
    } else {
        return Err("no [sitemap] section configured and no --url given".into());
    };

    tracing::info!("Found {} articles to crawl", targets.len());

    if options.dry_run {
        println!("=== docsearch Dry Run ===\n");
        println!("Would crawl {} articles:", targets.len());
        for target in targets.iter().take(20) {
            println!("  - {}", target);
        }
        if targets.len() > 20 {
            println!("  ... and {} more", targets.len() - 20);
        }
        return Ok(());
    }

    let mut sinks: Vec<Box<dyn ArticleSink>> = Vec::new();

    if !options.no_index {
        let engine = EngineClient::new(&config.search_engine)?;
        if let Err(e) = engine.ensure_index().await {
            tracing::warn!("Failed to prepare search index '{}': {}", engine.index(), e);
        }
        sinks.push(Box::new(engine));
    }

    let store = match &config.output.database_path {
        Some(path) => {
            let store = Arc::new(open_storage(Path::new(path))?);
            sinks.push(Box::new(store.clone()));
            Some(store)
        }
        None => None,
    };
    let run_id = match &store {
        Some(store) => Some(store.create_run(config_hash)?),
        None => None,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            ctrl_c.cancel();
        }
    });

    let coordinator = Coordinator::new(&config.crawler)?;
    let report = run_crawl(&coordinator, targets, &sinks, cancel.clone()).await;

    print_report(&report);

    if let (Some(store), Some(run_id)) = (&store, run_id) {
        let status = if cancel.is_cancelled() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        store.finish_run(
            run_id,
            status,
            report.succeeded as i64,
            report.failed as i64,
        )?;
    }

    if let Some(path) = &options.summary {
        generate_markdown_summary(&report, config_hash, path)?;
        println!("\n✓ Summary written to: {}", path.display());
    }

    Ok(())
}

/// Handles the search command
async fn handle_search(
    config: &Config,
    query: &str,
    from: usize,
    size: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = EngineClient::new(&config.search_engine)?;
    let service = SearchService::new(engine, ResultCache::from_config(&config.cache));

    let (from, size) = clamp_page(from, size);
    let result = service.search(query, from, size).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} results for '{}'\n", result.total, query.trim());
    for (rank, article) in result.articles.iter().enumerate() {
        println!("{:>3}. {}", from + rank + 1, article.title);
        println!("     {}", article.url);
        println!("     updated {}", article.updated_at.format("%Y-%m-%d"));
    }

    let shown = from + result.articles.len();
    if (shown as u64) < result.total {
        println!(
            "\nShowing {}-{} of {}; next page: --from {}",
            from + 1,
            shown,
            result.total,
            shown
        );
    }

    Ok(())
}

/// Handles the suggest command
async fn handle_suggest(config: &Config, prefix: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = EngineClient::new(&config.search_engine)?;
    let service = SearchService::new(engine, ResultCache::from_config(&config.cache));

    for title in service.suggest(prefix).await? {
        println!("{}", title);
    }

    Ok(())
}

/// Handles the check-config command: prints the validated configuration
fn handle_check_config(config: &Config, config_hash: &str) {
    println!("=== docsearch Configuration ===\n");

    println!("Crawler:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!(
        "  Courtesy delay: {}ms (+ up to {}ms jitter)",
        config.crawler.courtesy_delay_ms, config.crawler.max_jitter_ms
    );
    println!(
        "  Retries: {} (backoff {}ms per attempt)",
        config.crawler.max_retries, config.crawler.retry_base_delay_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    match &config.sitemap {
        Some(sitemap) => {
            println!("\nSitemap:");
            println!("  URL: {}", sitemap.url);
            println!("  Article pattern: {}", sitemap.article_pattern);
            println!("  Excluded ({}):", sitemap.exclude_patterns.len());
            for pattern in &sitemap.exclude_patterns {
                println!("    - {}", pattern);
            }
        }
        None => println!("\nSitemap: not configured (crawl requires --url)"),
    }

    println!("\nSearch engine:");
    println!("  URL: {}", config.search_engine.url);
    println!("  Index: {}", config.search_engine.index);
    println!(
        "  Authentication: {}",
        if config.search_engine.username.is_some() {
            "basic"
        } else {
            "none"
        }
    );

    println!("\nCache:");
    println!("  TTL: {}s", config.cache.ttl_secs);
    println!("  Sweep threshold: {} entries", config.cache.max_entries);

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path),
        None => println!("  Database: none"),
    }

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}

/// Handles the stats command: shows the most recent crawl run
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = &config.output.database_path else {
        return Err("no [output] database-path configured".into());
    };

    println!("Database: {}\n", path);
    let store = open_storage(Path::new(path))?;

    println!("Stored articles: {}", store.count_articles()?);

    match store.get_latest_run()? {
        Some(run) => {
            println!("\nLatest run #{}:", run.id);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status.to_db_string());
            println!("  Fetched: {}", run.succeeded);
            println!("  Failed: {}", run.failed);
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("\nNo crawl runs recorded"),
    }

    Ok(())
}
