//! Site-Mirror main entry point
//!
//! This is the command-line interface for the Site-Mirror static mirror builder.

use anyhow::Context;
use clap::Parser;
use site_mirror::config::{resolve_config, Config, ConfigOverrides};
use site_mirror::crawler::crawl;
use site_mirror::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Mirror: a static mirror builder for rendered websites
///
/// Site-Mirror visits every in-scope page reachable from a seed URL, saves
/// one HTML file per page, downloads referenced images, and rewrites links
/// so the mirror can be browsed offline.
#[derive(Parser, Debug)]
#[command(name = "site-mirror")]
#[command(version)]
#[command(about = "A static mirror builder for rendered websites", long_about = None)]
struct Cli {
    /// Page to start from; its host becomes the mirrored host
    #[arg(value_name = "SEED_URL", env = "MIRROR_SEED_URL")]
    seed_url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory for the mirror
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum number of pages to attempt
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Maximum concurrent asset downloads per page
    #[arg(long, value_name = "N")]
    asset_concurrency: Option<usize>,

    /// Selector or text that marks a page as rendered
    #[arg(long, value_name = "MARKER")]
    content_marker: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be mirrored without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let overrides = ConfigOverrides {
        seed_url: cli.seed_url.clone(),
        site_dir: cli.output.clone(),
        max_pages: cli.max_pages,
        max_concurrent_assets: cli.asset_concurrency,
        content_marker: cli.content_marker.clone(),
    };

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = match resolve_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e).context("failed to resolve configuration");
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_mirror=info,warn"),
            1 => EnvFilter::new("site_mirror=debug,info"),
            2 => EnvFilter::new("site_mirror=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Site-Mirror Dry Run ===\n");

    println!("Seed: {}", config.seed_url);

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Page timeout: {}ms", config.crawler.page_timeout_ms);
    println!("  Marker timeout: {}ms", config.crawler.marker_timeout_ms);
    println!("  Asset timeout: {}ms", config.crawler.asset_timeout_ms);
    println!(
        "  Max concurrent assets: {}",
        config.crawler.max_concurrent_assets
    );
    println!("  Content marker: {}", config.crawler.content_marker);
    println!(
        "  Expand disclosures: {}",
        config.crawler.expand_disclosures
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Pages: {}", config.site_dir().display());
    println!("  Assets: {}", config.assets_dir().display());
    println!("  Manifest: {}", config.output.write_manifest);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, quiet: bool) -> anyhow::Result<()> {
    let output_dir = config.site_dir().display().to_string();

    match crawl(config).await {
        Ok(summary) => {
            if !quiet {
                print_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror setup failed: {}", e);
            Err(e).with_context(|| format!("could not mirror into {}", output_dir))
        }
    }
}
