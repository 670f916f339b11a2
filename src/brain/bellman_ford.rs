//! Bounded Bellman-Ford Algorithm
//!
//! Step 2.1: The Pathfinder
//!
//! Every node starts at distance 0.0 (no source), edges are relaxed for at
//! most `max_hops` passes, and one extra pass flags edges that can still
//! relax. Each flagged edge is walked back through parent pointers to get a
//! concrete cycle.
//!
//! Limitations:
//! 1. Cycles longer than `max_hops` edges are not guaranteed to be found, and
//!    any extracted cycle longer than `max_hops` is dropped.
//! 2. The walk-back (|V| parent steps, then loop until a node repeats) is a
//!    heuristic. For some parent-pointer shapes it lands on a chain that is
//!    not a real loop; the evaluator rejects those because a closing edge is
//!    missing.

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::cartographer::RateGraph;

/// Minimum improvement for a relaxation to count
pub const RELAX_EPSILON: f64 = 1e-15;

/// Minimum improvement in the detection pass. Looser than `RELAX_EPSILON`
/// because round-off accumulates over up to `max_hops` passes.
pub const DETECT_EPSILON: f64 = 1e-12;

/// One position in a cycle: the asset held and the market used to leave it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CycleStep {
    pub asset: String,
    pub market_id: String,
}

/// A closed conversion loop as extracted from the parent pointers.
///
/// The last step repeats the first asset and reuses the previous market id.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCycle {
    pub steps: Vec<CycleStep>,
}

impl CandidateCycle {
    pub fn hop_count(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn assets(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.asset.as_str()).collect()
    }

    /// Markets of the hops, one per edge
    pub fn markets(&self) -> Vec<&str> {
        self.steps
            .iter()
            .take(self.hop_count())
            .map(|s| s.market_id.as_str())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.steps.len() >= 3 && self.steps.first().map(|s| &s.asset) == self.steps.last().map(|s| &s.asset)
    }
}

/// Distances and parent pointers left behind by the bounded relaxation
#[derive(Debug, Clone)]
pub struct Relaxation {
    pub dist: Vec<f64>,
    pub parent: Vec<Option<NodeIndex>>,
    pub parent_edge: Vec<Option<EdgeIndex>>,
    pub passes: usize,
}

/// Bounded Bellman-Ford over one venue's rate graph
pub struct BoundedBellmanFord<'a> {
    graph: &'a RateGraph,
    max_hops: usize,
}

impl<'a> BoundedBellmanFord<'a> {
    pub fn new(graph: &'a RateGraph, max_hops: usize) -> Self {
        Self { graph, max_hops }
    }

    /// Up to `max_hops` relaxation passes in edge insertion order
    pub fn relax(&self) -> Relaxation {
        let n = self.graph.node_count();
        let mut relaxation = Relaxation {
            dist: vec![0.0; n],
            parent: vec![None; n],
            parent_edge: vec![None; n],
            passes: 0,
        };

        for _ in 0..self.max_hops {
            relaxation.passes += 1;
            let mut updated = false;

            for edge in self.graph.graph.edge_references() {
                let u = edge.source().index();
                let v = edge.target().index();
                let candidate = relaxation.dist[u] + edge.weight().weight;

                if candidate < relaxation.dist[v] - RELAX_EPSILON {
                    relaxation.dist[v] = candidate;
                    relaxation.parent[v] = Some(edge.source());
                    relaxation.parent_edge[v] = Some(edge.id());
                    updated = true;
                }
            }

            if !updated {
                break;
            }
        }

        relaxation
    }

    /// All negative cycles reachable within the hop bound. May contain
    /// duplicates and rotations of the same loop.
    pub fn find_negative_cycles(&self) -> Vec<CandidateCycle> {
        let relaxation = self.relax();
        let mut cycles = Vec::new();
        let mut flagged = 0;
        let mut too_long = 0;

        for edge in self.graph.graph.edge_references() {
            let u = edge.source().index();
            let v = edge.target().index();

            if relaxation.dist[u] + edge.weight().weight < relaxation.dist[v] - DETECT_EPSILON {
                flagged += 1;

                let Some(cycle) = self.extract_cycle(&relaxation, edge.target()) else {
                    continue;
                };

                if cycle.hop_count() > self.max_hops {
                    too_long += 1;
                    debug!(
                        "Dropping {}-hop cycle (max {}): {}",
                        cycle.hop_count(),
                        self.max_hops,
                        cycle.assets().join(" → ")
                    );
                    continue;
                }

                debug_assert!(cycle.is_closed());
                debug!(
                    "Candidate: {} via {}",
                    cycle.assets().join(" → "),
                    cycle.markets().join(" | ")
                );
                cycles.push(cycle);
            }
        }

        info!(
            "Bellman-Ford: {} nodes, {} edges, {} passes, {} flagged edges, {} candidate cycles",
            self.graph.node_count(),
            self.graph.edge_count(),
            relaxation.passes,
            flagged,
            cycles.len()
        );
        if too_long > 0 {
            debug!("  {} cycles exceeded {} hops", too_long, self.max_hops);
        }

        cycles
    }

    /// Walk parents from a flagged node back into the cycle, then around it
    fn extract_cycle(&self, relaxation: &Relaxation, flagged: NodeIndex) -> Option<CandidateCycle> {
        let mut x = flagged;
        for _ in 0..self.graph.node_count() {
            if let Some(p) = relaxation.parent[x.index()] {
                x = p;
            }
        }

        let start = x;
        let mut current = start;
        let mut seen = HashSet::new();
        let mut chain = Vec::new();

        loop {
            if !seen.insert(current) {
                break;
            }
            let (Some(parent), Some(edge)) = (
                relaxation.parent[current.index()],
                relaxation.parent_edge[current.index()],
            ) else {
                break;
            };

            chain.push(CycleStep {
                asset: self.graph.get_asset(parent)?.to_string(),
                market_id: self.graph.graph[edge].market_id.clone(),
            });

            current = parent;
            if current == start {
                break;
            }
        }

        if chain.len() < 2 {
            return None;
        }

        chain.reverse();
        let closing = CycleStep {
            asset: chain[0].asset.clone(),
            market_id: chain[chain.len() - 1].market_id.clone(),
        };
        chain.push(closing);

        Some(CandidateCycle { steps: chain })
    }
}
