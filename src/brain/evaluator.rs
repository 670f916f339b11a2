//! Cycle Evaluator
//!
//! Step 2.2: The Auditor
//!
//! Re-prices a cycle's asset path with the real (non-log) edge rates, so
//! the reported profit never comes from accumulated log-space round-off.

use std::collections::HashMap;
use tracing::debug;

use crate::cartographer::ConversionEdge;

/// Real compounded rate of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Product of the edge rates, 0.0 when a hop has no edge
    pub product: f64,
    /// Market actually used for each hop
    pub markets: Vec<String>,
    /// Hops that had more than one parallel edge to choose from
    pub ambiguous_steps: usize,
}

impl Evaluation {
    fn unreachable() -> Self {
        Self {
            product: 0.0,
            markets: Vec::new(),
            ambiguous_steps: 0,
        }
    }

    pub fn profit(&self) -> f64 {
        self.product - 1.0
    }

    pub fn profit_bps(&self) -> f64 {
        self.profit() * 10_000.0
    }
}

/// Looks up raw edges by (from, to)
pub struct CycleEvaluator<'a> {
    edges: &'a [ConversionEdge],
    by_pair: HashMap<&'a str, HashMap<&'a str, Vec<usize>>>,
}

impl<'a> CycleEvaluator<'a> {
    pub fn new(edges: &'a [ConversionEdge]) -> Self {
        let mut by_pair: HashMap<&str, HashMap<&str, Vec<usize>>> = HashMap::new();
        for (i, edge) in edges.iter().enumerate() {
            by_pair
                .entry(edge.from.as_str())
                .or_default()
                .entry(edge.to.as_str())
                .or_default()
                .push(i);
        }

        Self { edges, by_pair }
    }

    /// Best-rate edge from `from` to `to` and how many parallel edges exist.
    /// Equal rates keep the earliest edge.
    pub fn best_edge(&self, from: &str, to: &str) -> Option<(&'a ConversionEdge, usize)> {
        let candidates = self.by_pair.get(from)?.get(to)?;
        let edges: &'a [ConversionEdge] = self.edges;

        let mut best: Option<&'a ConversionEdge> = None;
        for &i in candidates {
            let edge = &edges[i];
            if best.map_or(true, |b| edge.rate > b.rate) {
                best = Some(edge);
            }
        }

        best.map(|edge| (edge, candidates.len()))
    }

    /// Multiply the rates along an asset path `[A, B, ..., A]`
    pub fn evaluate_path(&self, assets: &[&str]) -> Evaluation {
        let mut product = 1.0;
        let mut markets = Vec::with_capacity(assets.len().saturating_sub(1));
        let mut ambiguous_steps = 0;

        for hop in assets.windows(2) {
            let Some((edge, parallel)) = self.best_edge(hop[0], hop[1]) else {
                debug!("No edge {} -> {}, cycle rejected", hop[0], hop[1]);
                return Evaluation::unreachable();
            };

            if parallel > 1 {
                ambiguous_steps += 1;
                debug!(
                    "{} parallel edges {} -> {}, using {} @ {:.8}",
                    parallel, hop[0], hop[1], edge.market_id, edge.rate
                );
            }

            product *= edge.rate;
            markets.push(edge.market_id.clone());
        }

        Evaluation {
            product,
            markets,
            ambiguous_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, rate: f64, market: &str) -> ConversionEdge {
        ConversionEdge {
            from: from.to_string(),
            to: to.to_string(),
            rate,
            market_id: market.to_string(),
        }
    }

    #[test]
    fn test_product_along_cycle() {
        let edges = vec![
            edge("A", "B", 1.0, "AB"),
            edge("B", "C", 1.0, "BC"),
            edge("C", "A", 1.03, "CA"),
        ];
        let evaluator = CycleEvaluator::new(&edges);
        let eval = evaluator.evaluate_path(&["A", "B", "C", "A"]);

        assert!((eval.product - 1.03).abs() < 1e-12);
        assert!((eval.profit_bps() - 300.0).abs() < 1e-6);
        assert_eq!(eval.markets, vec!["AB", "BC", "CA"]);
        assert_eq!(eval.ambiguous_steps, 0);
    }

    #[test]
    fn test_missing_hop_gives_zero() {
        let edges = vec![edge("A", "B", 1.0, "AB"), edge("B", "C", 1.0, "BC")];
        let eval = CycleEvaluator::new(&edges).evaluate_path(&["A", "B", "C", "A"]);

        assert_eq!(eval.product, 0.0);
        assert!(eval.markets.is_empty());
        assert!(eval.profit_bps() < 0.0);
    }

    #[test]
    fn test_parallel_edges_pick_best_rate() {
        let edges = vec![
            edge("A", "B", 1.00, "AB-1"),
            edge("A", "B", 1.02, "AB-2"),
            edge("A", "B", 1.01, "AB-3"),
            edge("B", "A", 1.0, "BA"),
        ];
        let evaluator = CycleEvaluator::new(&edges);

        let (best, parallel) = evaluator.best_edge("A", "B").unwrap();
        assert_eq!(best.market_id, "AB-2");
        assert_eq!(parallel, 3);

        let eval = evaluator.evaluate_path(&["A", "B", "A"]);
        assert!((eval.product - 1.02).abs() < 1e-12);
        assert_eq!(eval.ambiguous_steps, 1);
        assert_eq!(eval.markets, vec!["AB-2", "BA"]);
    }

    #[test]
    fn test_equal_rates_keep_first_edge() {
        let edges = vec![edge("A", "B", 1.0, "first"), edge("A", "B", 1.0, "second")];
        let (best, _) = CycleEvaluator::new(&edges).best_edge("A", "B").unwrap();
        assert_eq!(best.market_id, "first");
    }
}
