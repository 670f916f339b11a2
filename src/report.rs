//! Result output: console table and CSV export.

use console::style;
use eyre::{Result, WrapErr};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;
use tabled::{Table, Tabled};

use crate::brain::ArbitrageOpportunity;

pub const NO_RESULTS: &str = "No profitable cycles above threshold right now.";

/// One CSV line, bps rounded to 2 dp and percent to 4 dp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub exchange: String,
    pub start_asset: String,
    pub hops: usize,
    pub profit_bps: f64,
    pub profit_pct: f64,
    pub path_assets: String,
    pub path_markets: String,
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Exchange")]
    exchange: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Hops")]
    hops: usize,
    #[tabled(rename = "Profit (bps)")]
    profit_bps: String,
    #[tabled(rename = "Profit (%)")]
    profit_pct: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Markets")]
    markets: String,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

impl From<&ArbitrageOpportunity> for CsvRow {
    fn from(opp: &ArbitrageOpportunity) -> Self {
        Self {
            exchange: opp.venue.clone(),
            start_asset: opp.start_asset.clone(),
            hops: opp.hop_count,
            profit_bps: round_to(opp.profit_bps, 2),
            profit_pct: round_to(opp.profit_pct(), 4),
            path_assets: opp.format_assets(),
            path_markets: opp.format_markets(),
        }
    }
}

/// Ranked opportunities as a console table
pub fn render_table(opportunities: &[ArbitrageOpportunity]) -> String {
    let rows: Vec<TableRow> = opportunities
        .iter()
        .enumerate()
        .map(|(i, opp)| TableRow {
            rank: i + 1,
            exchange: opp.venue.clone(),
            start: opp.start_asset.clone(),
            hops: opp.hop_count,
            profit_bps: format!("{:.2}", opp.profit_bps),
            profit_pct: format!("{:.4}", opp.profit_pct()),
            path: opp.format_assets(),
            markets: opp.format_markets(),
        })
        .collect();

    Table::new(rows).to_string()
}

pub fn print_results(opportunities: &[ArbitrageOpportunity]) {
    if opportunities.is_empty() {
        println!("{}", style(NO_RESULTS).yellow());
        return;
    }

    for line in render_table(opportunities).lines() {
        println!("  {}", line);
    }
}

/// Write the CSV (header included) to any writer
pub fn write_csv<W: io::Write>(writer: W, opportunities: &[ArbitrageOpportunity]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for opp in opportunities {
        writer.serialize(CsvRow::from(opp))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv<P: AsRef<Path>>(path: P, opportunities: &[ArbitrageOpportunity]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    write_csv(file, opportunities)
}
