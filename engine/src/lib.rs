pub mod analyzer;
pub mod persist;
pub mod popularity;
pub mod query;
pub mod rank;
pub mod store;

pub use popularity::LinkGraph;
pub use rank::Hit;
pub use store::{Document, IndexStore};

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

/// Run a query against a previously populated index directory. Read-only;
/// safe to call concurrently with other queries.
pub fn run_query(index_dir: &Path, raw: &str) -> Result<Vec<Hit>> {
    let store = IndexStore::load(index_dir)?;
    let paths = persist::IndexPaths::new(index_dir);
    let popularity = if paths.popularity().exists() {
        persist::load_popularity(&paths)?
    } else {
        HashMap::new()
    };
    Ok(rank::search(&store, &popularity, raw))
}
