use anyhow::Result;
use clap::{Parser, Subcommand};
use crawler::{start_crawl, CrawlConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "crawler")]
#[command(about = "Crawl a site into a search index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from a seed URL and build the on-disk index
    Crawl {
        /// Seed URL to start crawling from
        #[arg(long)]
        seed: String,
        /// Index directory
        #[arg(long, default_value = "./indexdir")]
        index: PathBuf,
        /// Discard any existing index before crawling
        #[arg(long, default_value_t = false)]
        rebuild: bool,
        /// Request timeout seconds
        #[arg(long, default_value_t = 12)]
        timeout_secs: u64,
        /// User-Agent string for robots.txt and page fetches
        #[arg(long, default_value = "sitesearch-bot/0.1 (+https://example.com/bot)")]
        user_agent: String,
    },
    /// Run a query against an existing index and print the hits as JSON
    Search {
        /// Index directory
        #[arg(long, default_value = "./indexdir")]
        index: PathBuf,
        /// Query string; double-quote phrases for exact matching
        #[arg(long)]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl { seed, index, rebuild, timeout_secs, user_agent } => {
            let config = CrawlConfig {
                seed,
                index_dir: index,
                rebuild,
                user_agent,
                timeout: Duration::from_secs(timeout_secs),
            };
            let report = start_crawl(&config).await?;
            tracing::info!(
                visited = report.urls_visited,
                indexed = report.pages_indexed,
                "crawl finished"
            );
        }
        Commands::Search { index, query } => {
            let hits = engine::run_query(&index, &query)?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
    }
    Ok(())
}
