use crate::analyzer;
use crate::query::{self, ParsedQuery};
use crate::store::{Document, IndexStore, QueryMatch};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Characters of context kept on each side of a highlighted match.
const EXCERPT_CONTEXT: usize = 60;
const EXCERPT_SEPARATOR: &str = " ... ";

/// One ranked search result. `content` is the full stored case-insensitive
/// text; the surrounding service feeds it to a summarizer.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub title: String,
    pub url: String,
    pub highlight: String,
    pub content: String,
}

/// Execute `raw` against the store and rank the results:
/// score = sum of tf * idf over matched terms and phrase words, plus the
/// page's popularity.
/// Ties are broken by ascending url so results are reproducible.
pub fn search(store: &IndexStore, popularity: &HashMap<String, f64>, raw: &str) -> Vec<Hit> {
    let parsed = query::parse(raw);
    search_parsed(store, popularity, &parsed)
}

pub fn search_parsed(
    store: &IndexStore,
    popularity: &HashMap<String, f64>,
    parsed: &ParsedQuery,
) -> Vec<Hit> {
    let matches = store.execute(parsed);
    let total_docs = store.doc_count() as f64;

    let mut scored: Vec<(f64, Hit)> = Vec::with_capacity(matches.len());
    for m in matches {
        let Some(doc) = store.get(&m.url) else { continue };

        // Phrase words go through the same ci scoring as bare terms; a word
        // the ci field dropped has df 0 and contributes nothing.
        let mut scoring_terms = m.matched_terms.clone();
        for phrase in &m.matched_phrases {
            for term in analyzer::tokenize_ci(phrase) {
                if !scoring_terms.contains(&term) {
                    scoring_terms.push(term);
                }
            }
        }

        let mut score = 0.0;
        for term in &scoring_terms {
            let df = store.doc_frequency(term) as f64;
            let idf = if df > 0.0 { (total_docs / df).ln() } else { 0.0 };
            let tf = doc.content_ci.split_whitespace().filter(|w| *w == term).count() as f64;
            score += tf * idf;
        }
        score += popularity.get(&m.url).copied().unwrap_or(0.0);

        let highlight = build_highlight(doc, &m);
        scored.push((
            score,
            Hit {
                title: doc.title.clone(),
                url: m.url,
                highlight,
                content: doc.content_ci.clone(),
            },
        ));
    }

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.url.cmp(&b.1.url))
    });
    scored.into_iter().map(|(_, hit)| hit).collect()
}

/// Excerpts come from whichever fields the query touched: the raw text for
/// phrase hits, the normalized text for term hits. Identical excerpts are
/// emitted once, distinct ones joined with the separator.
fn build_highlight(doc: &Document, m: &QueryMatch) -> String {
    let mut excerpts: Vec<String> = Vec::new();
    for phrase in &m.matched_phrases {
        let tokens = analyzer::tokenize_cs(phrase);
        if let Some(e) = excerpt(&doc.content_cs, &phrase_pattern(&tokens)) {
            if !excerpts.contains(&e) {
                excerpts.push(e);
            }
        }
    }
    for term in &m.matched_terms {
        if let Some(e) = excerpt(&doc.content_ci, &term_pattern(term)) {
            if !excerpts.contains(&e) {
                excerpts.push(e);
            }
        }
    }
    excerpts.join(EXCERPT_SEPARATOR)
}

/// Whole-word match for one index term: "red" never lights up inside
/// "hatred".
fn term_pattern(term: &str) -> Regex {
    Regex::new(&format!(r"\b{}\b", regex::escape(term)))
        .expect("escaped pattern is a valid regex")
}

/// Phrase tokens separated by any run of non-token characters, mirroring the
/// adjacency rule used at match time: "red panda" still excerpts text that
/// reads "red, panda".
fn phrase_pattern(tokens: &[String]) -> Regex {
    let body = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join(r"[^\p{L}\p{N}_']+");
    Regex::new(&format!(r"\b{body}\b")).expect("escaped pattern is a valid regex")
}

/// Window around the first occurrence of `pattern`, with every occurrence
/// inside the window wrapped in `<em>` tags.
fn excerpt(text: &str, pattern: &Regex) -> Option<String> {
    let found = pattern.find(text)?;
    let start = floor_boundary(text, found.start().saturating_sub(EXCERPT_CONTEXT));
    let end = ceil_boundary(text, (found.end() + EXCERPT_CONTEXT).min(text.len()));
    let window = &text[start..end];
    Some(pattern.replace_all(window, "<em>$0</em>").into_owned())
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Document;

    fn store_with(docs: &[(&str, &str, &str)]) -> IndexStore {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = IndexStore::open(dir.path(), true).expect("open store");
        for (url, title, text) in docs {
            store.add_document(Document::new(*url, *title, text)).expect("add");
        }
        store
    }

    #[test]
    fn ranks_by_tfidf_plus_popularity() {
        let store = store_with(&[
            ("https://s/b", "B", "beta gamma"),
            ("https://s/c", "C", "gamma"),
        ]);
        let mut popularity = HashMap::new();
        popularity.insert("https://s/c".to_string(), 3.0);
        let hits = search(&store, &popularity, "gamma");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://s/c");
        assert_eq!(hits[1].url, "https://s/b");
    }

    #[test]
    fn equal_scores_break_ties_by_url() {
        let store = store_with(&[
            ("https://s/b", "B", "alpha beta"),
            ("https://s/a", "A", "beta gamma"),
        ]);
        let hits = search(&store, &HashMap::new(), "beta");
        assert_eq!(hits[0].url, "https://s/a");
        assert_eq!(hits[1].url, "https://s/b");
    }

    #[test]
    fn absent_term_idf_is_zero_not_an_error() {
        // A phrase-only match in a one-document store: idf is ln(1) = 0 and
        // the stopword never reaches scoring, yet the hit survives.
        let store = store_with(&[("https://s/a", "A", "The Panda")]);
        let hits = search(&store, &HashMap::new(), r#""The Panda""#);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn phrase_term_frequency_drives_ranking() {
        let store = store_with(&[
            ("https://s/a", "A", "gamma filler"),
            ("https://s/b", "B", "gamma gamma gamma filler"),
            ("https://s/c", "C", "filler"),
        ]);
        let hits = search(&store, &HashMap::new(), r#""gamma""#);
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://s/b", "https://s/a"]);
    }

    #[test]
    fn highlight_wraps_matches() {
        let store = store_with(&[("https://s/a", "A", "bamboo for the panda grove")]);
        let hits = search(&store, &HashMap::new(), "panda");
        assert!(hits[0].highlight.contains("<em>panda</em>"));
    }

    #[test]
    fn duplicate_excerpts_collapse() {
        let store = store_with(&[("https://s/a", "A", "gamma gamma")]);
        let hits = search(&store, &HashMap::new(), "gamma");
        assert!(!hits[0].highlight.contains(EXCERPT_SEPARATOR));
    }

    #[test]
    fn term_highlight_matches_whole_words_only() {
        let store = store_with(&[("https://s/a", "A", "hatred of red tape")]);
        let hits = search(&store, &HashMap::new(), "red");
        assert!(hits[0].highlight.contains("<em>red</em> tape"));
        assert!(!hits[0].highlight.contains("hat<em>red</em>"));
    }

    #[test]
    fn phrase_excerpt_survives_punctuation() {
        let store = store_with(&[("https://s/a", "A", "the red, panda sleeps")]);
        let hits = search(&store, &HashMap::new(), r#""red panda""#);
        assert!(hits[0].highlight.contains("<em>red, panda</em>"));
    }

    #[test]
    fn content_is_the_stored_ci_text() {
        let store = store_with(&[("https://s/a", "A", "The Panda Grove")]);
        let hits = search(&store, &HashMap::new(), "grove");
        assert_eq!(hits[0].content, "panda grove");
    }

    #[test]
    fn excerpt_is_char_boundary_safe() {
        let text = "é".repeat(200) + " panda " + &"é".repeat(200);
        let e = excerpt(&text, &term_pattern("panda")).expect("found");
        assert!(e.contains("<em>panda</em>"));
    }
}
