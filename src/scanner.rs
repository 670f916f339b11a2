//! Per-venue scan
//!
//! Runs the whole detection core for one snapshot:
//! priced pairs -> edges -> log graph -> candidate cycles -> opportunities.
//! Pure and synchronous; venues never share state.

use eyre::{eyre, Result};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::brain::{ArbitrageOpportunity, BoundedBellmanFord, CycleEvaluator, FilterStats, ProfitFilter};
use crate::cartographer::{to_log_edges, ConversionEdge, EdgeBuildReport, EdgeBuilder, RateGraph, VenueSnapshot};
use crate::error::GraphError;

/// Parameters of one venue's detection run
#[derive(Debug, Clone)]
pub struct ScanParams {
    pub venue: String,
    pub max_hops: usize,
    pub min_profit_bps: f64,
    /// Required start/end assets, in priority order. Empty means any.
    pub base_assets: Vec<String>,
    pub prefer_orderbook: bool,
    pub include_fees: bool,
}

impl ScanParams {
    pub fn validate(&self) -> Result<()> {
        if self.venue.trim().is_empty() {
            return Err(eyre!("Venue id must not be empty"));
        }
        if self.max_hops < 2 {
            return Err(eyre!("MAX_HOPS must be at least 2 (got {})", self.max_hops));
        }
        if !self.min_profit_bps.is_finite() {
            return Err(eyre!("MIN_PROFIT_BPS must be a finite number"));
        }
        Ok(())
    }
}

/// Everything one venue's scan produced
#[derive(Debug, Clone, Default)]
pub struct VenueScan {
    pub venue: String,
    pub edge_report: EdgeBuildReport,
    pub node_count: usize,
    pub edge_count: usize,
    pub filter_stats: FilterStats,
    pub opportunities: Vec<ArbitrageOpportunity>,
}

/// Scan a venue snapshot
pub fn scan_venue(
    snapshot: &VenueSnapshot,
    allowed_assets: &HashSet<String>,
    params: &ScanParams,
) -> Result<VenueScan, GraphError> {
    let (edges, edge_report) = EdgeBuilder::new(allowed_assets)
        .prefer_orderbook(params.prefer_orderbook)
        .include_fees(params.include_fees)
        .build(snapshot);

    let mut scan = scan_edges(&edges, params)?;
    scan.edge_report = edge_report;
    Ok(scan)
}

/// Scan an already built edge set
pub fn scan_edges(edges: &[ConversionEdge], params: &ScanParams) -> Result<VenueScan, GraphError> {
    let mut scan = VenueScan {
        venue: params.venue.clone(),
        ..Default::default()
    };

    let log_edges = to_log_edges(edges);
    let graph = RateGraph::from_log_edges(&log_edges)?;
    scan.node_count = graph.node_count();
    scan.edge_count = graph.edge_count();

    if graph.node_count() == 0 {
        warn!("[{}] No nodes, skipping", params.venue);
        return Ok(scan);
    }

    info!(
        "[{}] Graph built: {} nodes, {} edges",
        params.venue, scan.node_count, scan.edge_count
    );

    let cycles = BoundedBellmanFord::new(&graph, params.max_hops).find_negative_cycles();

    let evaluator = CycleEvaluator::new(edges);
    let (opportunities, filter_stats) = ProfitFilter::new(params.min_profit_bps)
        .with_base_assets(&params.base_assets)
        .filter_profitable(&params.venue, &cycles, &evaluator);

    scan.filter_stats = filter_stats;
    scan.opportunities = opportunities;
    Ok(scan)
}
