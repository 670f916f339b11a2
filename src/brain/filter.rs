//! Profit Filter
//!
//! Step 2.3: The Filter
//!
//! Turns raw detector output into reportable opportunities:
//! - rotates each loop to a canonical start (a base asset when configured)
//! - drops duplicate loops by asset-sequence signature
//! - re-prices with real rates and applies the bps threshold
//! - ranks best first

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use super::{CandidateCycle, CycleEvaluator};

/// One reportable arbitrage loop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    pub venue: String,
    pub start_asset: String,
    pub hop_count: usize,
    pub profit_bps: f64,
    /// Closed path, first == last
    pub asset_path: Vec<String>,
    /// One market per hop
    pub market_path: Vec<String>,
}

impl ArbitrageOpportunity {
    pub fn profit_pct(&self) -> f64 {
        self.profit_bps / 100.0
    }

    pub fn format_assets(&self) -> String {
        self.asset_path.join(" → ")
    }

    pub fn format_markets(&self) -> String {
        self.market_path.join(" | ")
    }
}

/// Why candidates were dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStats {
    pub candidates: usize,
    pub duplicates: usize,
    pub off_base: usize,
    pub unreachable: usize,
    pub below_threshold: usize,
    pub ambiguous_steps: usize,
}

/// Threshold and base-asset filter over detected cycles
pub struct ProfitFilter {
    min_profit_bps: f64,
    /// Allowed start assets, in priority order. Empty allows every start.
    base_assets: Vec<String>,
}

impl ProfitFilter {
    pub fn new(min_profit_bps: f64) -> Self {
        Self {
            min_profit_bps,
            base_assets: Vec::new(),
        }
    }

    pub fn with_base_assets(mut self, base_assets: &[String]) -> Self {
        self.base_assets = base_assets.to_vec();
        self
    }

    /// Rotate a loop so it starts at the highest-priority base asset it
    /// visits, or at its smallest asset when no base set is configured.
    /// Returns the closed asset path, or `None` when the loop touches no
    /// base asset.
    pub fn canonical_path(&self, cycle: &CandidateCycle) -> Option<Vec<String>> {
        let assets = cycle.assets();
        let ring = &assets[..cycle.hop_count()];
        if ring.is_empty() {
            return None;
        }

        let start = if self.base_assets.is_empty() {
            ring.iter()
                .enumerate()
                .min_by(|a, b| a.1.cmp(b.1))
                .map(|(i, _)| i)?
        } else {
            self.base_assets
                .iter()
                .find_map(|base| ring.iter().position(|a| *a == base.as_str()))?
        };

        let mut path: Vec<String> = ring[start..]
            .iter()
            .chain(ring[..start].iter())
            .map(|a| a.to_string())
            .collect();
        path.push(path[0].clone());
        Some(path)
    }

    /// Deduplicate, re-price and threshold the detector's cycles
    pub fn filter_profitable(
        &self,
        venue: &str,
        cycles: &[CandidateCycle],
        evaluator: &CycleEvaluator,
    ) -> (Vec<ArbitrageOpportunity>, FilterStats) {
        let mut stats = FilterStats {
            candidates: cycles.len(),
            ..Default::default()
        };
        let mut seen_signatures: HashSet<String> = HashSet::new();
        let mut profitable = Vec::new();

        for cycle in cycles {
            let Some(path) = self.canonical_path(cycle) else {
                stats.off_base += 1;
                continue;
            };

            let signature = path.join("->");
            if !seen_signatures.insert(signature) {
                stats.duplicates += 1;
                continue;
            }

            let refs: Vec<&str> = path.iter().map(String::as_str).collect();
            let evaluation = evaluator.evaluate_path(&refs);
            stats.ambiguous_steps += evaluation.ambiguous_steps;

            if evaluation.markets.is_empty() {
                stats.unreachable += 1;
                continue;
            }

            let bps = evaluation.profit_bps();
            if !bps.is_finite() || evaluation.product <= 1.0 || bps < self.min_profit_bps {
                stats.below_threshold += 1;
                debug!(
                    "Filtered: {} | Return: {:.6}x | {:.2} bps",
                    path.join(" → "),
                    evaluation.product,
                    bps
                );
                continue;
            }

            profitable.push(ArbitrageOpportunity {
                venue: venue.to_string(),
                start_asset: path[0].clone(),
                hop_count: path.len() - 1,
                profit_bps: bps,
                asset_path: path,
                market_path: evaluation.markets,
            });
        }

        rank(&mut profitable);

        info!(
            "[{}] {} candidates -> {} opportunities ({} duplicate, {} off-base, {} broken, {} below {:.1} bps)",
            venue,
            stats.candidates,
            profitable.len(),
            stats.duplicates,
            stats.off_base,
            stats.unreachable,
            stats.below_threshold,
            self.min_profit_bps
        );
        if stats.ambiguous_steps > 0 {
            info!(
                "[{}] {} hops had parallel edges (best rate used)",
                venue, stats.ambiguous_steps
            );
        }

        (profitable, stats)
    }
}

/// Best profit first, shorter loops first on ties
pub fn rank(opportunities: &mut [ArbitrageOpportunity]) {
    opportunities.sort_by(|a, b| {
        b.profit_bps
            .partial_cmp(&a.profit_bps)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.hop_count.cmp(&b.hop_count))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::CycleStep;
    use crate::cartographer::ConversionEdge;

    fn cycle(assets: &[&str]) -> CandidateCycle {
        let steps = assets
            .iter()
            .enumerate()
            .map(|(i, a)| CycleStep {
                asset: a.to_string(),
                market_id: format!("m{}", i.min(assets.len() - 2)),
            })
            .collect();
        CandidateCycle { steps }
    }

    fn edge(from: &str, to: &str, rate: f64) -> ConversionEdge {
        ConversionEdge {
            from: from.to_string(),
            to: to.to_string(),
            rate,
            market_id: format!("{}/{}", from, to),
        }
    }

    fn triangle(closing_rate: f64) -> Vec<ConversionEdge> {
        vec![edge("A", "B", 1.0), edge("B", "C", 1.0), edge("C", "A", closing_rate)]
    }

    fn bases(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rotation_to_smallest_asset() {
        let filter = ProfitFilter::new(0.0);
        let path = filter.canonical_path(&cycle(&["B", "C", "A", "B"])).unwrap();
        assert_eq!(path, vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_rotation_to_priority_base() {
        let filter = ProfitFilter::new(0.0).with_base_assets(&bases(&["USDT", "BTC"]));

        let path = filter
            .canonical_path(&cycle(&["ETH", "BTC", "USDT", "ETH"]))
            .unwrap();
        assert_eq!(path, vec!["USDT", "ETH", "BTC", "USDT"]);

        assert!(filter.canonical_path(&cycle(&["ETH", "SOL", "ETH"])).is_none());
    }

    #[test]
    fn test_rotations_deduplicated() {
        let edges = triangle(1.03);
        let evaluator = CycleEvaluator::new(&edges);
        let cycles = vec![
            cycle(&["B", "C", "A", "B"]),
            cycle(&["A", "B", "C", "A"]),
            cycle(&["C", "A", "B", "C"]),
        ];

        let (opps, stats) = ProfitFilter::new(10.0).filter_profitable("test", &cycles, &evaluator);
        assert_eq!(opps.len(), 1);
        assert_eq!(stats.duplicates, 2);

        let opp = &opps[0];
        assert_eq!(opp.start_asset, "A");
        assert_eq!(opp.hop_count, 3);
        assert_eq!(opp.asset_path, vec!["A", "B", "C", "A"]);
        assert_eq!(opp.market_path, vec!["A/B", "B/C", "C/A"]);
        assert!((opp.profit_bps - 300.0).abs() < 1e-6);
        assert!((opp.profit_pct() - 3.0).abs() < 1e-8);
    }

    #[test]
    fn test_threshold_uses_real_rates() {
        let edges = triangle(1.0005); // 5 bps
        let evaluator = CycleEvaluator::new(&edges);
        let cycles = vec![cycle(&["A", "B", "C", "A"])];

        let (opps, stats) = ProfitFilter::new(10.0).filter_profitable("test", &cycles, &evaluator);
        assert!(opps.is_empty());
        assert_eq!(stats.below_threshold, 1);

        let (opps, _) = ProfitFilter::new(5.0 - 1e-6).filter_profitable("test", &cycles, &evaluator);
        assert_eq!(opps.len(), 1);
    }

    #[test]
    fn test_losing_cycle_rejected_even_with_negative_threshold() {
        let edges = triangle(0.999);
        let evaluator = CycleEvaluator::new(&edges);
        let cycles = vec![cycle(&["A", "B", "C", "A"])];

        let (opps, stats) = ProfitFilter::new(-50.0).filter_profitable("test", &cycles, &evaluator);
        assert!(opps.is_empty());
        assert_eq!(stats.below_threshold, 1);
    }

    #[test]
    fn test_cycle_with_missing_edge_is_unreachable() {
        let edges = vec![edge("A", "B", 2.0), edge("B", "C", 2.0)];
        let evaluator = CycleEvaluator::new(&edges);
        let cycles = vec![cycle(&["A", "B", "C", "A"])];

        let (opps, stats) = ProfitFilter::new(0.0).filter_profitable("test", &cycles, &evaluator);
        assert!(opps.is_empty());
        assert_eq!(stats.unreachable, 1);
    }

    #[test]
    fn test_ranking() {
        let make = |bps: f64, hops: usize| ArbitrageOpportunity {
            venue: "v".into(),
            start_asset: "A".into(),
            hop_count: hops,
            profit_bps: bps,
            asset_path: vec![],
            market_path: vec![],
        };
        let mut opps = vec![make(12.0, 3), make(30.0, 4), make(30.0, 3), make(15.0, 2)];
        rank(&mut opps);

        let order: Vec<(f64, usize)> = opps.iter().map(|o| (o.profit_bps, o.hop_count)).collect();
        assert_eq!(order, vec![(30.0, 3), (30.0, 4), (15.0, 2), (12.0, 3)]);
    }

    #[test]
    fn test_format_paths() {
        let opp = ArbitrageOpportunity {
            venue: "binance".into(),
            start_asset: "USDT".into(),
            hop_count: 3,
            profit_bps: 12.5,
            asset_path: bases(&["USDT", "BTC", "ETH", "USDT"]),
            market_path: bases(&["BTC/USDT", "ETH/BTC", "ETH/USDT"]),
        };
        assert_eq!(opp.format_assets(), "USDT → BTC → ETH → USDT");
        assert_eq!(opp.format_markets(), "BTC/USDT | ETH/BTC | ETH/USDT");
    }
}
