//! Graph Construction
//!
//! Step 1.2: The Map Maker
//!
//! Priced pairs become fee-adjusted conversion edges, edges become
//! `-ln(rate)` weights, and weights land in a petgraph `DiGraph` keyed by
//! asset symbol. A profitable loop is then a negative cycle.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use super::market::{resolve_quote, PricedPair, Quote, UnavailableReason, VenueSnapshot, DEFAULT_TAKER_FEE};
use crate::error::GraphError;

/// One unit of `from` converts into `rate` units of `to`, fee included
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionEdge {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub market_id: String,
}

/// Same edge in additive form: `weight = -ln(rate)`
#[derive(Debug, Clone, PartialEq)]
pub struct LogEdge {
    pub from: String,
    pub to: String,
    pub weight: f64,
    pub market_id: String,
}

/// Which leg of a pair an edge represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// base -> quote, priced at the bid
    Sell,
    /// quote -> base, priced at 1 / ask
    Buy,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sell => write!(f, "sell"),
            Direction::Buy => write!(f, "buy"),
        }
    }
}

/// A leg that produced no edge, and why
#[derive(Debug, Clone, PartialEq)]
pub struct UnavailableLeg {
    pub market_id: String,
    pub direction: Direction,
    pub reason: UnavailableReason,
}

/// What happened to every pair of a snapshot
#[derive(Debug, Clone, Default)]
pub struct EdgeBuildReport {
    pub pairs_seen: usize,
    /// Both directions produced an edge
    pub fully_priced: usize,
    /// Exactly one direction produced an edge
    pub partially_priced: usize,
    /// Eligible but no direction could be priced
    pub unpriced: usize,
    pub skipped_inactive: usize,
    pub skipped_incomplete: usize,
    pub skipped_filtered: usize,
    pub unavailable_legs: Vec<UnavailableLeg>,
}

impl EdgeBuildReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped_inactive + self.skipped_incomplete + self.skipped_filtered
    }
}

/// `rate * (1 - fee)`, applied once per edge
pub fn apply_fee(rate: f64, fee: f64) -> f64 {
    rate * (1.0 - fee)
}

/// Converts a venue snapshot into conversion edges
pub struct EdgeBuilder<'a> {
    allowed_assets: &'a HashSet<String>,
    prefer_orderbook: bool,
    include_fees: bool,
}

impl<'a> EdgeBuilder<'a> {
    /// An empty allow-list means every asset is allowed
    pub fn new(allowed_assets: &'a HashSet<String>) -> Self {
        Self {
            allowed_assets,
            prefer_orderbook: true,
            include_fees: true,
        }
    }

    pub fn prefer_orderbook(mut self, prefer: bool) -> Self {
        self.prefer_orderbook = prefer;
        self
    }

    pub fn include_fees(mut self, include: bool) -> Self {
        self.include_fees = include;
        self
    }

    /// Fee for a pair: its own taker fee, then the venue default, then 10 bps
    fn fee_for(&self, pair: &PricedPair, venue_default: Option<f64>) -> f64 {
        if !self.include_fees {
            return 0.0;
        }
        let valid = |f: &f64| f.is_finite() && *f >= 0.0;
        pair.taker_fee
            .filter(valid)
            .or(venue_default.filter(valid))
            .unwrap_or(DEFAULT_TAKER_FEE)
    }

    fn is_allowed(&self, asset: &str) -> bool {
        self.allowed_assets.is_empty() || self.allowed_assets.contains(asset)
    }

    pub fn build(&self, snapshot: &VenueSnapshot) -> (Vec<ConversionEdge>, EdgeBuildReport) {
        let mut edges = Vec::with_capacity(snapshot.pairs.len() * 2);
        let mut report = EdgeBuildReport::default();

        for pair in &snapshot.pairs {
            report.pairs_seen += 1;

            if !pair.active {
                report.skipped_inactive += 1;
                continue;
            }
            if pair.base.is_empty() || pair.quote.is_empty() {
                report.skipped_incomplete += 1;
                continue;
            }
            if !self.is_allowed(&pair.base) || !self.is_allowed(&pair.quote) {
                report.skipped_filtered += 1;
                continue;
            }

            let fee = self.fee_for(pair, snapshot.default_taker_fee);
            let mut emitted = 0;

            // BASE -> QUOTE: sell base at the bid
            let sell = resolve_quote(pair.best_bid, pair.last_price, self.prefer_orderbook);
            match leg_rate(sell, fee, false) {
                Ok(rate) => {
                    edges.push(ConversionEdge {
                        from: pair.base.clone(),
                        to: pair.quote.clone(),
                        rate,
                        market_id: pair.market_id.clone(),
                    });
                    emitted += 1;
                }
                Err(reason) => report.unavailable_legs.push(UnavailableLeg {
                    market_id: pair.market_id.clone(),
                    direction: Direction::Sell,
                    reason,
                }),
            }

            // QUOTE -> BASE: buy base at the ask
            let buy = resolve_quote(pair.best_ask, pair.last_price, self.prefer_orderbook);
            match leg_rate(buy, fee, true) {
                Ok(rate) => {
                    edges.push(ConversionEdge {
                        from: pair.quote.clone(),
                        to: pair.base.clone(),
                        rate,
                        market_id: pair.market_id.clone(),
                    });
                    emitted += 1;
                }
                Err(reason) => report.unavailable_legs.push(UnavailableLeg {
                    market_id: pair.market_id.clone(),
                    direction: Direction::Buy,
                    reason,
                }),
            }

            match emitted {
                2 => report.fully_priced += 1,
                1 => report.partially_priced += 1,
                _ => report.unpriced += 1,
            }
        }

        for leg in report.unavailable_legs.iter().take(10) {
            debug!("{}: {} leg unavailable ({})", leg.market_id, leg.direction, leg.reason);
        }

        info!(
            "[{}] {} pairs -> {} edges ({} full, {} one-sided, {} unpriced, {} skipped)",
            snapshot.venue,
            report.pairs_seen,
            edges.len(),
            report.fully_priced,
            report.partially_priced,
            report.unpriced,
            report.skipped_total()
        );
        if report.unpriced > 0 {
            warn!(
                "[{}] {} pairs had no usable price on either side",
                snapshot.venue, report.unpriced
            );
        }

        (edges, report)
    }
}

/// Turn a resolved quote into an effective rate, inverting for the buy leg
fn leg_rate(quote: Quote, fee: f64, invert: bool) -> Result<f64, UnavailableReason> {
    let price = match quote {
        Quote::Priced(p) => p,
        Quote::Unavailable(reason) => return Err(reason),
    };
    let raw = if invert { 1.0 / price } else { price };
    let rate = apply_fee(raw, fee);
    if rate > 0.0 && rate.is_finite() {
        Ok(rate)
    } else {
        Err(UnavailableReason::FeeConsumesRate)
    }
}

/// `-ln(rate)` for every edge with a positive rate
pub fn to_log_edges(edges: &[ConversionEdge]) -> Vec<LogEdge> {
    edges
        .iter()
        .filter(|e| e.rate > 0.0)
        .map(|e| LogEdge {
            from: e.from.clone(),
            to: e.to.clone(),
            weight: -e.rate.ln(),
            market_id: e.market_id.clone(),
        })
        .collect()
}

/// Edge data in the rate graph
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub market_id: String,
    pub weight: f64,
}

/// The log-weighted graph of one venue
pub struct RateGraph {
    pub graph: DiGraph<String, EdgeData>,
    pub asset_to_node: HashMap<String, NodeIndex>,
}

impl RateGraph {
    /// Build from an explicit node set. Every edge endpoint must be declared
    /// and every weight finite.
    pub fn new(nodes: &[String], edges: &[LogEdge]) -> Result<Self, GraphError> {
        let mut graph = Self {
            graph: DiGraph::with_capacity(nodes.len(), edges.len()),
            asset_to_node: HashMap::with_capacity(nodes.len()),
        };

        for asset in nodes {
            graph.get_or_create_node(asset);
        }

        for edge in edges {
            let from = graph.node_for(&edge.from, &edge.market_id)?;
            let to = graph.node_for(&edge.to, &edge.market_id)?;

            if !edge.weight.is_finite() {
                return Err(GraphError::NonFiniteWeight {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    market: edge.market_id.clone(),
                    weight: edge.weight,
                });
            }

            graph.graph.add_edge(
                from,
                to,
                EdgeData {
                    market_id: edge.market_id.clone(),
                    weight: edge.weight,
                },
            );
        }

        Ok(graph)
    }

    /// Node set derived from the edges, sorted for repeatable node order
    pub fn from_log_edges(edges: &[LogEdge]) -> Result<Self, GraphError> {
        let nodes: BTreeSet<&String> = edges.iter().flat_map(|e| [&e.from, &e.to]).collect();
        let nodes: Vec<String> = nodes.into_iter().cloned().collect();
        Self::new(&nodes, edges)
    }

    fn get_or_create_node(&mut self, asset: &str) -> NodeIndex {
        if let Some(&node) = self.asset_to_node.get(asset) {
            return node;
        }

        let node = self.graph.add_node(asset.to_string());
        self.asset_to_node.insert(asset.to_string(), node);
        node
    }

    fn node_for(&self, asset: &str, market: &str) -> Result<NodeIndex, GraphError> {
        self.get_node(asset).ok_or_else(|| GraphError::UnknownNode {
            asset: asset.to_string(),
            market: market.to_string(),
        })
    }

    pub fn get_node(&self, asset: &str) -> Option<NodeIndex> {
        self.asset_to_node.get(asset).copied()
    }

    pub fn get_asset(&self, node: NodeIndex) -> Option<&str> {
        self.graph.node_weight(node).map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: Vec<PricedPair>) -> (Vec<ConversionEdge>, EdgeBuildReport) {
        let allowed = HashSet::new();
        EdgeBuilder::new(&allowed).build(&VenueSnapshot::new("test", pairs))
    }

    fn find<'a>(edges: &'a [ConversionEdge], from: &str, to: &str) -> Option<&'a ConversionEdge> {
        edges.iter().find(|e| e.from == from && e.to == to)
    }

    #[test]
    fn test_two_edges_per_pair_from_book() {
        let (edges, report) = build(vec![
            PricedPair::new("BTC", "USDT").with_book(50_000.0, 50_010.0).with_fee(0.001),
        ]);

        assert_eq!(edges.len(), 2);
        assert_eq!(report.fully_priced, 1);

        let sell = find(&edges, "BTC", "USDT").unwrap();
        assert!((sell.rate - 50_000.0 * 0.999).abs() < 1e-9);
        assert_eq!(sell.market_id, "BTC/USDT");

        let buy = find(&edges, "USDT", "BTC").unwrap();
        assert!((buy.rate - (1.0 / 50_010.0) * 0.999).abs() < 1e-15);
    }

    #[test]
    fn test_fee_fallback_chain() {
        let allowed = HashSet::new();
        let builder = EdgeBuilder::new(&allowed);
        let pair = PricedPair::new("ETH", "BTC").with_last(0.05);

        assert_eq!(builder.fee_for(&pair.clone().with_fee(0.002), Some(0.0005)), 0.002);
        assert_eq!(builder.fee_for(&pair, Some(0.0005)), 0.0005);
        assert_eq!(builder.fee_for(&pair, None), DEFAULT_TAKER_FEE);

        let no_fees = EdgeBuilder::new(&allowed).include_fees(false);
        assert_eq!(no_fees.fee_for(&pair.with_fee(0.002), None), 0.0);
    }

    #[test]
    fn test_fee_monotonicity() {
        let raw = 1234.5;
        assert!(apply_fee(raw, 0.002) < apply_fee(raw, 0.001));
        assert!(apply_fee(raw, 0.001) < apply_fee(raw, 0.0));
    }

    #[test]
    fn test_one_sided_pair() {
        let mut pair = PricedPair::new("SOL", "USDT");
        pair.best_bid = Some(140.0);

        let (edges, report) = build(vec![pair]);
        assert_eq!(edges.len(), 1);
        assert!(find(&edges, "SOL", "USDT").is_some());
        assert_eq!(report.partially_priced, 1);
        assert_eq!(report.unavailable_legs.len(), 1);
        assert_eq!(report.unavailable_legs[0].direction, Direction::Buy);
    }

    #[test]
    fn test_pair_without_any_price_contributes_nothing() {
        let (edges, report) = build(vec![PricedPair::new("XRP", "USDT")]);
        assert!(edges.is_empty());
        assert_eq!(report.unpriced, 1);
        assert_eq!(report.unavailable_legs.len(), 2);
        assert!(report
            .unavailable_legs
            .iter()
            .all(|l| l.reason == UnavailableReason::Missing));
    }

    #[test]
    fn test_skips_inactive_incomplete_and_filtered() {
        let allowed: HashSet<String> = ["BTC", "USDT"].iter().map(|s| s.to_string()).collect();
        let incomplete = PricedPair::new("", "USDT").with_last(1.0);

        let snapshot = VenueSnapshot::new(
            "test",
            vec![
                PricedPair::new("BTC", "USDT").with_last(50_000.0).inactive(),
                incomplete,
                PricedPair::new("DOGE", "USDT").with_last(0.1),
                PricedPair::new("BTC", "USDT").with_last(50_000.0),
            ],
        );

        let (edges, report) = EdgeBuilder::new(&allowed).build(&snapshot);
        assert_eq!(edges.len(), 2);
        assert_eq!(report.skipped_inactive, 1);
        assert_eq!(report.skipped_incomplete, 1);
        assert_eq!(report.skipped_filtered, 1);
    }

    #[test]
    fn test_rates_always_positive() {
        let (edges, _) = build(vec![
            PricedPair::new("A", "B").with_book(-1.0, 0.0),
            PricedPair::new("C", "D").with_last(f64::NAN),
            PricedPair::new("E", "F").with_last(2.0).with_fee(1.5),
            PricedPair::new("G", "H").with_book(3.0, 3.1),
        ]);
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.rate > 0.0));
    }

    #[test]
    fn test_log_weight_duality() {
        let edges = vec![
            ConversionEdge { from: "A".into(), to: "B".into(), rate: 0.9, market_id: "A/B".into() },
            ConversionEdge { from: "B".into(), to: "C".into(), rate: 1.2, market_id: "B/C".into() },
            ConversionEdge { from: "C".into(), to: "A".into(), rate: 0.95, market_id: "C/A".into() },
        ];
        let log_edges = to_log_edges(&edges);

        for (raw, log) in edges.iter().zip(&log_edges) {
            assert!(((-log.weight).exp() - raw.rate).abs() < 1e-12);
        }

        let sum: f64 = log_edges.iter().map(|e| e.weight).sum();
        let product: f64 = edges.iter().map(|e| e.rate).product();
        assert!(((-sum).exp() - product).abs() < 1e-12);
    }

    #[test]
    fn test_log_transform_drops_non_positive() {
        let edges = vec![ConversionEdge {
            from: "A".into(),
            to: "B".into(),
            rate: 0.0,
            market_id: "A/B".into(),
        }];
        assert!(to_log_edges(&edges).is_empty());
    }

    #[test]
    fn test_graph_rejects_unknown_node() {
        let edges = vec![LogEdge { from: "A".into(), to: "Z".into(), weight: 0.1, market_id: "A/Z".into() }];
        let err = RateGraph::new(&["A".to_string()], &edges).err().unwrap();
        assert_eq!(
            err,
            GraphError::UnknownNode { asset: "Z".into(), market: "A/Z".into() }
        );
    }

    #[test]
    fn test_graph_rejects_non_finite_weight() {
        let edges = vec![LogEdge {
            from: "A".into(),
            to: "B".into(),
            weight: f64::NEG_INFINITY,
            market_id: "A/B".into(),
        }];
        let result = RateGraph::from_log_edges(&edges);
        assert!(matches!(result, Err(GraphError::NonFiniteWeight { .. })));
    }

    #[test]
    fn test_graph_nodes_sorted_and_deduplicated() {
        let edges = vec![
            LogEdge { from: "C".into(), to: "A".into(), weight: 0.0, market_id: "C/A".into() },
            LogEdge { from: "A".into(), to: "C".into(), weight: 0.0, market_id: "C/A".into() },
        ];
        let graph = RateGraph::from_log_edges(&edges).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.get_asset(NodeIndex::new(0)), Some("A"));
        assert_eq!(graph.get_node("C"), Some(NodeIndex::new(1)));
    }
}
