use crate::fetcher::PageFetcher;
use crate::html;
use crate::politeness::PolitenessGate;
use anyhow::Result;
use engine::popularity::LinkGraph;
use engine::store::{Document, IndexStore};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Parse-and-index pipeline, selected at session construction. One concrete
/// variant today: dual-field documents (raw + normalized text). New
/// pipelines are added as variants, not lookup-table entries.
#[derive(Debug, Clone, Copy, Default)]
pub enum IndexMode {
    #[default]
    DualField,
}

impl IndexMode {
    fn build_document(self, url: &str, title: String, text: &str) -> Document {
        match self {
            IndexMode::DualField => Document::new(url, title, text),
        }
    }
}

/// Per-crawl state: the work list, visited set, and link graph all live here
/// for exactly one crawl and are never shared.
pub struct CrawlSession<F: PageFetcher> {
    fetcher: F,
    gate: PolitenessGate,
    store: IndexStore,
    mode: IndexMode,
    visited: HashSet<String>,
    graph: LinkGraph,
}

impl<F: PageFetcher> CrawlSession<F> {
    pub fn new(fetcher: F, store: IndexStore) -> Self {
        Self {
            fetcher,
            gate: PolitenessGate::new(),
            store,
            mode: IndexMode::default(),
            visited: HashSet::new(),
            graph: LinkGraph::new(),
        }
    }

    /// Crawl everything same-domain reachable from `seed` off an explicit
    /// work list. A failure on one page never aborts the crawl; only store
    /// errors are fatal.
    pub async fn crawl(&mut self, seed: &Url) -> Result<()> {
        let mut work: VecDeque<Url> = VecDeque::new();
        work.push_back(defragment(seed));

        while let Some(url) = work.pop_front() {
            let key = url.to_string();
            if self.visited.contains(&key) {
                continue;
            }
            if !self.gate.is_allowed(&self.fetcher, &url).await {
                tracing::info!(%url, "blocked by robots policy");
                continue;
            }
            // Mark visited before fetching so the URL can never re-enter
            // the work list mid-fetch.
            self.visited.insert(key.clone());
            self.graph.entry(key.clone()).or_default();

            let page = match self.fetcher.fetch(&url).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(%url, %err, "fetch failed, skipping page");
                    continue;
                }
            };
            if !page.is_html() {
                tracing::debug!(%url, content_type = %page.content_type, "non-HTML response, not indexed");
                continue;
            }

            let extracted = html::extract(&page.body);
            let title = extracted.title.unwrap_or_else(|| key.clone());
            let doc = self.mode.build_document(&key, title, &extracted.text);
            self.store.add_document(doc)?;

            for href in &extracted.hrefs {
                let Ok(target) = Url::parse(href).or_else(|_| url.join(href)) else {
                    continue;
                };
                let target = defragment(&target);
                if !same_site(&url, &target) {
                    continue;
                }
                // Disallowed URLs never enter the link graph or the queue.
                if !self.gate.is_allowed(&self.fetcher, &target).await {
                    continue;
                }
                let target_key = target.to_string();
                if let Some(edges) = self.graph.get_mut(&key) {
                    edges.insert(target_key.clone());
                }
                if !self.visited.contains(&target_key) {
                    work.push_back(target);
                }
            }
        }

        tracing::info!(
            visited = self.visited.len(),
            indexed = self.store.doc_count(),
            "crawl complete"
        );
        Ok(())
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn into_parts(self) -> (IndexStore, LinkGraph) {
        (self.store, self.graph)
    }
}

/// Fragments never distinguish pages: `/a` and `/a#top` are one URL in the
/// work list, the visited set, and the link graph.
pub fn defragment(url: &Url) -> Url {
    let mut u = url.clone();
    u.set_fragment(None);
    u
}

/// Same-domain per the seed rule: the resolved link shares scheme and host
/// with the page it appeared on.
pub fn same_site(page: &Url, target: &Url) -> bool {
    page.scheme() == target.scheme() && page.host_str() == target.host_str()
}
