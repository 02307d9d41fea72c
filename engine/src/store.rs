use crate::analyzer;
use crate::persist::{self, IndexPaths, MetaFile};
use crate::query::ParsedQuery;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

/// One crawled page. Never mutated after creation within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    /// Raw page text, used for exact phrase matching and phrase excerpts.
    pub content_cs: String,
    /// Normalized page text (lowercase, stopwords removed), used for term
    /// matching, TF/IDF, and term excerpts.
    pub content_ci: String,
}

impl Document {
    pub fn new(url: impl Into<String>, title: impl Into<String>, text: &str) -> Self {
        let content_cs = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let content_ci = analyzer::normalize_ci(text);
        Self { url: url.into(), title: title.into(), content_cs, content_ci }
    }
}

/// A document matched by a query, with the exact subset of index terms and
/// phrases it matched. The ranker derives TF/IDF and highlights from these.
#[derive(Debug)]
pub struct QueryMatch {
    pub url: String,
    pub matched_terms: Vec<String>,
    pub matched_phrases: Vec<String>,
}

/// Append-only document store with case-insensitive postings for document
/// frequency. One document per url; duplicates are rejected.
pub struct IndexStore {
    paths: IndexPaths,
    docs: HashMap<String, Document>,
    /// ci term -> url -> term frequency
    postings: HashMap<String, HashMap<String, u32>>,
}

impl IndexStore {
    /// Open the store under `root`. A requested rebuild wipes any existing
    /// index directory first; otherwise an existing store is reused.
    /// Directory I/O failures here are fatal.
    pub fn open(root: &Path, rebuild: bool) -> Result<Self> {
        let paths = IndexPaths::new(root);
        persist::prepare_root(&paths, rebuild)?;
        if paths.docs().exists() {
            return Self::load(root);
        }
        Ok(Self { paths, docs: HashMap::new(), postings: HashMap::new() })
    }

    /// Load an existing on-disk store for querying.
    pub fn load(root: &Path) -> Result<Self> {
        let paths = IndexPaths::new(root);
        let docs = persist::load_docs(&paths)?;
        let postings = persist::load_postings(&paths)?;
        Ok(Self { paths, docs, postings })
    }

    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        if self.docs.contains_key(&doc.url) {
            bail!("duplicate document: {}", doc.url);
        }
        for term in doc.content_ci.split_whitespace() {
            *self
                .postings
                .entry(term.to_string())
                .or_default()
                .entry(doc.url.clone())
                .or_insert(0) += 1;
        }
        tracing::debug!(url = %doc.url, title = %doc.title, "indexed document");
        self.docs.insert(doc.url.clone(), doc);
        Ok(())
    }

    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }

    /// Number of documents whose case-insensitive field contains `term`.
    pub fn doc_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, HashMap::len)
    }

    pub fn get(&self, url: &str) -> Option<&Document> {
        self.docs.get(url)
    }

    /// Run a parsed query: every phrase clause must appear as an adjacent
    /// token sequence in `content_cs`, and every fuzzy term must match at
    /// least one index term present in the document's `content_ci`. The
    /// empty query matches nothing.
    pub fn execute(&self, query: &ParsedQuery) -> Vec<QueryMatch> {
        if query.is_empty() {
            return Vec::new();
        }

        // Expand each fuzzy term against the lexicon once, up front.
        let mut lexicon: Vec<&str> = self.postings.keys().map(String::as_str).collect();
        lexicon.sort_unstable();
        let expansions: Vec<Vec<&str>> = query
            .terms
            .iter()
            .map(|t| lexicon.iter().copied().filter(|w| t.matches(w)).collect())
            .collect();
        // AND semantics: a term absent from the whole corpus sinks the query.
        if expansions.iter().any(Vec::is_empty) {
            return Vec::new();
        }

        let mut matches = Vec::new();
        'docs: for (url, doc) in &self.docs {
            let doc_terms: HashSet<&str> = doc.content_ci.split_whitespace().collect();
            let mut matched_terms: Vec<String> = Vec::new();
            for candidates in &expansions {
                let present: Vec<&str> = candidates
                    .iter()
                    .copied()
                    .filter(|c| doc_terms.contains(c))
                    .collect();
                if present.is_empty() {
                    continue 'docs;
                }
                for term in present {
                    if !matched_terms.iter().any(|t| t == term) {
                        matched_terms.push(term.to_string());
                    }
                }
            }

            let mut matched_phrases = Vec::new();
            if !query.phrases.is_empty() {
                let cs_tokens = analyzer::tokenize_cs(&doc.content_cs);
                for phrase in &query.phrases {
                    if !contains_sequence(&cs_tokens, &phrase.tokens) {
                        continue 'docs;
                    }
                    matched_phrases.push(phrase.text.clone());
                }
            }

            matches.push(QueryMatch { url: url.clone(), matched_terms, matched_phrases });
        }
        matches
    }

    /// Persist documents, postings, and meta under the store root.
    pub fn save(&self, seed: Option<&str>) -> Result<()> {
        persist::save_docs(&self.paths, &self.docs)?;
        persist::save_postings(&self.paths, &self.postings)?;
        let meta = MetaFile {
            num_docs: self.docs.len() as u32,
            seed: seed.map(String::from),
            created_at: time::OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            version: 1,
        };
        persist::save_meta(&self.paths, &meta)?;
        tracing::info!(num_docs = meta.num_docs, root = %self.paths.root.display(), "index saved");
        Ok(())
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }
}

fn contains_sequence(haystack: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query;

    fn store_with(docs: &[(&str, &str, &str)]) -> IndexStore {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = IndexStore::open(dir.path(), true).expect("open store");
        for (url, title, text) in docs {
            store.add_document(Document::new(*url, *title, text)).expect("add");
        }
        store
    }

    #[test]
    fn rejects_duplicate_url() {
        let mut store = store_with(&[("https://s/a", "A", "alpha")]);
        let err = store
            .add_document(Document::new("https://s/a", "A again", "alpha"))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate document"));
        assert_eq!(store.doc_count(), 1);
    }

    #[test]
    fn document_frequency_counts_docs_not_occurrences() {
        let store = store_with(&[
            ("https://s/a", "A", "panda panda panda"),
            ("https://s/b", "B", "panda bamboo"),
            ("https://s/c", "C", "bamboo"),
        ]);
        assert_eq!(store.doc_frequency("panda"), 2);
        assert_eq!(store.doc_frequency("bamboo"), 2);
        assert_eq!(store.doc_frequency("absent"), 0);
    }

    #[test]
    fn phrase_requires_adjacency() {
        let store = store_with(&[
            ("https://s/a", "A", "the red panda sleeps"),
            ("https://s/b", "B", "red fur on a panda"),
        ]);
        let q = query::parse(r#""red panda""#);
        let matches = store.execute(&q);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].url, "https://s/a");
        assert_eq!(matches[0].matched_phrases, vec!["red panda"]);
    }

    #[test]
    fn phrase_is_case_sensitive() {
        let store = store_with(&[("https://s/a", "A", "Red Panda sleeps")]);
        assert!(store.execute(&query::parse(r#""red panda""#)).is_empty());
        assert_eq!(store.execute(&query::parse(r#""Red Panda""#)).len(), 1);
    }

    #[test]
    fn terms_are_anded() {
        let store = store_with(&[
            ("https://s/a", "A", "alpha beta"),
            ("https://s/b", "B", "beta gamma"),
        ]);
        let matches = store.execute(&query::parse("alpha beta"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].url, "https://s/a");
    }

    #[test]
    fn empty_query_matches_nothing() {
        let store = store_with(&[("https://s/a", "A", "alpha")]);
        assert!(store.execute(&query::parse("")).is_empty());
        assert!(store.execute(&query::parse("   ")).is_empty());
    }

    #[test]
    fn fuzzy_term_reports_matched_index_term() {
        let store = store_with(&[("https://s/a", "A", "platypus habitat")]);
        let matches = store.execute(&query::parse("platypu"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_terms, vec!["platypus"]);
    }
}
