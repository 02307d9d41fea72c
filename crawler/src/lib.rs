pub mod fetcher;
pub mod html;
pub mod politeness;
pub mod session;

use anyhow::{Context, Result};
use engine::persist;
use engine::popularity;
use engine::store::IndexStore;
use fetcher::{HttpFetcher, PageFetcher};
use session::CrawlSession;
use url::Url;
use std::path::PathBuf;
use std::time::Duration;

pub struct CrawlConfig {
    pub seed: String,
    pub index_dir: PathBuf,
    pub rebuild: bool,
    pub user_agent: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct CrawlReport {
    pub urls_visited: usize,
    pub pages_indexed: usize,
}

/// Crawl from the seed into the index directory, then score popularity once
/// over the finished link graph and persist everything.
pub async fn start_crawl(config: &CrawlConfig) -> Result<CrawlReport> {
    let seed = Url::parse(&config.seed).with_context(|| format!("invalid seed url {}", config.seed))?;
    let fetcher = HttpFetcher::new(&config.user_agent, config.timeout)?;
    run_crawl(fetcher, &seed, config).await
}

/// The crawl pipeline behind `start_crawl`, generic over the fetcher so
/// tests can run it against an in-memory site.
pub async fn run_crawl<F: PageFetcher>(fetcher: F, seed: &Url, config: &CrawlConfig) -> Result<CrawlReport> {
    let store = IndexStore::open(&config.index_dir, config.rebuild)?;
    let mut session = CrawlSession::new(fetcher, store);
    session.crawl(seed).await?;

    let urls_visited = session.visited().len();
    let (store, graph) = session.into_parts();

    // Popularity is derived from the completed graph snapshot, exactly once.
    let scores = popularity::score(&graph);

    store.save(Some(seed.as_str()))?;
    persist::save_popularity(store.paths(), &scores)?;
    persist::save_link_graph(store.paths(), &graph)?;

    Ok(CrawlReport { urls_visited, pages_indexed: store.doc_count() })
}
