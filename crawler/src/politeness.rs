use crate::fetcher::PageFetcher;
use parking_lot::RwLock;
use std::collections::HashMap;
use url::Url;

/// The parsed `*` group of an origin's robots.txt. Crawl-delay directives
/// are ignored: the gate is a binary allow/deny check.
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    allows: Vec<String>,
    disallows: Vec<String>,
}

/// Per-origin robots gate. The policy document is fetched once per origin
/// and cached for the lifetime of the gate.
///
/// Fail-open: an unreachable or unreadable robots.txt yields an empty rule
/// set, which allows everything.
#[derive(Default)]
pub struct PolitenessGate {
    cache: RwLock<HashMap<String, RobotsRules>>,
}

impl PolitenessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// May a generic agent fetch `url`?
    pub async fn is_allowed<F: PageFetcher>(&self, fetcher: &F, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let cached = { self.cache.read().get(&origin).cloned() };
        let rules = match cached {
            Some(rules) => rules,
            None => {
                let rules = self.fetch_rules(fetcher, url, &origin).await;
                self.cache.write().insert(origin, rules.clone());
                rules
            }
        };
        path_allowed(url.path(), &rules)
    }

    async fn fetch_rules<F: PageFetcher>(&self, fetcher: &F, url: &Url, origin: &str) -> RobotsRules {
        let robots_url = match Url::parse(&format!("{origin}/robots.txt")) {
            Ok(u) => u,
            Err(_) => return RobotsRules::default(),
        };
        match fetcher.fetch(&robots_url).await {
            Ok(page) => parse_robots(&page.body),
            Err(err) => {
                tracing::debug!(%url, %err, "robots.txt unreadable, failing open");
                RobotsRules::default()
            }
        }
    }
}

/// Minimal parser for the `*` group's Allow/Disallow lines. Empty rule
/// values are skipped: an empty Disallow means allow-all, not deny-all.
fn parse_robots(txt: &str) -> RobotsRules {
    let mut active = false;
    let mut rules = RobotsRules::default();
    for line in txt.lines() {
        let l = line.trim();
        if l.is_empty() || l.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = l.split_once(':') {
            let key = k.trim().to_lowercase();
            let val = v.trim();
            match key.as_str() {
                "user-agent" => active = val == "*",
                "allow" if active && !val.is_empty() => rules.allows.push(val.to_string()),
                "disallow" if active && !val.is_empty() => rules.disallows.push(val.to_string()),
                _ => {}
            }
        }
    }
    rules
}

/// Longest matching rule wins; Allow wins a length tie.
fn path_allowed(path: &str, rules: &RobotsRules) -> bool {
    let mut best_allow: Option<&str> = None;
    let mut best_dis: Option<&str> = None;
    for a in &rules.allows {
        if path.starts_with(a.as_str()) && best_allow.map_or(true, |p| a.len() > p.len()) {
            best_allow = Some(a);
        }
    }
    for d in &rules.disallows {
        if path.starts_with(d.as_str()) && best_dis.map_or(true, |p| d.len() > p.len()) {
            best_dis = Some(d);
        }
    }
    match (best_allow, best_dis) {
        (Some(a), Some(d)) => a.len() >= d.len(),
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => true,
    }
}
