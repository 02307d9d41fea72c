use std::collections::{HashMap, HashSet};

/// Outbound same-domain links discovered on each crawled page.
pub type LinkGraph = HashMap<String, HashSet<String>>;

/// Fixed iteration count for the popularity recurrence.
pub const ITERATIONS: usize = 100;

/// Mass-redistribution popularity over a finalized link graph snapshot.
///
/// Every node (sources and edge targets) starts at 1.0. Each round, a page
/// with out-degree k sends old_score/k along every edge; a page with no
/// outbound edges is a sink: it keeps the mass it has accumulated and adds
/// any inflow, but never sends anything back out. A non-sink is rebuilt from
/// inflow alone each round. Deliberately not PageRank: no damping factor, no
/// teleportation, no dangling-mass redistribution.
pub fn score(graph: &LinkGraph) -> HashMap<String, f64> {
    let mut nodes: HashSet<&str> = graph.keys().map(String::as_str).collect();
    for targets in graph.values() {
        nodes.extend(targets.iter().map(String::as_str));
    }

    let out_degree = |node: &str| graph.get(node).map_or(0, HashSet::len);

    let mut scores: HashMap<&str, f64> = nodes.iter().map(|&n| (n, 1.0)).collect();
    for _ in 0..ITERATIONS {
        let mut next: HashMap<&str, f64> = nodes
            .iter()
            .map(|&n| (n, if out_degree(n) == 0 { scores[n] } else { 0.0 }))
            .collect();
        for (page, targets) in graph {
            if targets.is_empty() {
                continue;
            }
            let share = scores[page.as_str()] / targets.len() as f64;
            for target in targets {
                *next.entry(target.as_str()).or_insert(0.0) += share;
            }
        }
        scores = next;
    }

    scores.into_iter().map(|(n, s)| (n.to_string(), s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> LinkGraph {
        edges
            .iter()
            .map(|(from, tos)| {
                (from.to_string(), tos.iter().map(|t| t.to_string()).collect())
            })
            .collect()
    }

    #[test]
    fn sink_accumulates_and_never_loses_mass() {
        // A -> B, B has no outbound edges. A drains after one round; B keeps
        // everything ever routed to it.
        let g = graph(&[("a", &["b"] as &[&str]), ("b", &[])]);
        let scores = score(&g);
        assert_eq!(scores["a"], 0.0);
        assert_eq!(scores["b"], 2.0);
    }

    #[test]
    fn scenario_graph_converges() {
        // A -> {B, C}, B -> {C}, C sink. All mass ends up in C.
        let g = graph(&[("a", &["b", "c"] as &[&str]), ("b", &["c"]), ("c", &[])]);
        let scores = score(&g);
        assert_eq!(scores["a"], 0.0);
        assert_eq!(scores["b"], 0.0);
        assert!((scores["c"] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn edge_target_missing_from_keys_is_a_sink() {
        let g = graph(&[("a", &["b"] as &[&str])]);
        let scores = score(&g);
        assert_eq!(scores["b"], 2.0);
    }

    #[test]
    fn empty_graph_scores_nothing() {
        assert!(score(&LinkGraph::new()).is_empty());
    }
}
