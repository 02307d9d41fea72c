use crate::analyzer;
use lazy_static::lazy_static;
use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};
use regex::Regex;
use std::collections::HashSet;

/// Maximum edit distance tolerated by fuzzy terms, matching the source
/// parser's bare `~` modifier.
pub const MAX_EDIT_DISTANCE: u8 = 1;

lazy_static! {
    static ref PHRASE: Regex = Regex::new(r#""([^"]+)""#).expect("valid regex");
    static ref LEV_BUILDER: LevenshteinAutomatonBuilder =
        LevenshteinAutomatonBuilder::new(MAX_EDIT_DISTANCE, true);
}

/// A literal phrase clause over the case-sensitive field.
pub struct PhraseClause {
    /// The quoted text, whitespace-collapsed, for excerpt lookup.
    pub text: String,
    /// The exact token sequence a document must contain adjacently.
    pub tokens: Vec<String>,
}

/// A single query term matched within `MAX_EDIT_DISTANCE` edits against the
/// case-insensitive lexicon.
pub struct FuzzyTerm {
    pub term: String,
    dfa: DFA,
}

impl FuzzyTerm {
    fn new(term: String) -> Self {
        let dfa = LEV_BUILDER.build_dfa(&term);
        Self { term, dfa }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        matches!(self.dfa.eval(candidate), Distance::Exact(_))
    }
}

/// A parsed query: phrase clauses AND-ed with fuzzy term clauses. Both lists
/// empty means the empty query, which matches nothing.
pub struct ParsedQuery {
    pub phrases: Vec<PhraseClause>,
    pub terms: Vec<FuzzyTerm>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty() && self.terms.is_empty()
    }
}

/// Parse a raw query string. Double-quoted substrings become phrase clauses
/// in order of appearance; the remainder is tokenized case-insensitively and
/// each distinct surviving token becomes a fuzzy term. A stray unbalanced
/// quote is ordinary remainder text, never a parse error.
pub fn parse(raw: &str) -> ParsedQuery {
    let mut phrases = Vec::new();
    for cap in PHRASE.captures_iter(raw) {
        let quoted = cap[1].split_whitespace().collect::<Vec<_>>().join(" ");
        let tokens = analyzer::tokenize_cs(&quoted);
        if !tokens.is_empty() {
            phrases.push(PhraseClause { text: quoted, tokens });
        }
    }

    let remainder = PHRASE.replace_all(raw, " ");
    let mut seen = HashSet::new();
    let terms = analyzer::tokenize_ci(&remainder)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .map(FuzzyTerm::new)
        .collect();

    ParsedQuery { phrases, terms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_phrases_in_order() {
        let q = parse(r#""red panda" climbs "tall tree""#);
        let texts: Vec<&str> = q.phrases.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["red panda", "tall tree"]);
        assert_eq!(q.phrases[0].tokens, vec!["red", "panda"]);
        let terms: Vec<&str> = q.terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["climbs"]);
    }

    #[test]
    fn empty_and_whitespace_queries_are_empty() {
        assert!(parse("").is_empty());
        assert!(parse("   ").is_empty());
    }

    #[test]
    fn stray_quote_is_not_an_error() {
        let q = parse(r#"red" panda"#);
        assert!(q.phrases.is_empty());
        let terms: Vec<&str> = q.terms.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["red", "panda"]);
    }

    #[test]
    fn duplicate_terms_collapse() {
        let q = parse("panda panda");
        assert_eq!(q.terms.len(), 1);
    }

    #[test]
    fn fuzzy_tolerates_one_edit() {
        let q = parse("platypu");
        assert!(q.terms[0].matches("platypus"));
        assert!(q.terms[0].matches("platypu"));
        assert!(!q.terms[0].matches("platypuses"));
    }

    #[test]
    fn stopword_only_query_is_empty() {
        assert!(parse("the and of").is_empty());
    }
}
