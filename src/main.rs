//! hopscan - multi-hop arbitrage detection inside a single exchange
//!
//! Run with: cargo run -- --exchanges binance,kucoin --max-hops 4
//!
//! Each venue is scanned on its own: market snapshot -> rate graph ->
//! bounded Bellman-Ford -> real-rate re-pricing -> ranked report.

use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod brain;
mod cartographer;
mod config;
mod error;
mod notifier;
mod report;
mod scanner;

use brain::{rank, ArbitrageOpportunity};
use cartographer::{fetch_top_symbols, VenueFetcher};
use config::{Args, Config};
use notifier::TelegramNotifier;
use scanner::scan_venue;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🔁 HOPSCAN - Multi-hop Arbitrage Finder").cyan().bold()
    );
    println!(
        "{}",
        style("    Intra-exchange | Bounded Bellman-Ford | Fee-aware").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(SPINNER_FRAMES)
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hopscan=info".parse()?),
        )
        .init();

    print_banner();

    let args = Args::parse();
    let config = Config::load(&args)?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file or command line flags");
        return Err(e);
    }

    config.print_summary();
    println!();

    if let Some(path) = &args.write_config {
        config.save_to_file(path)?;
        println!("{} Wrote configuration to {}", style("✓").green(), path.display());
        return Ok(());
    }

    let scanned_at = Utc::now();
    let venues = config.venues()?;

    // =============================================
    // PHASE 1: THE CARTOGRAPHER
    // =============================================
    println!(
        "{}",
        style("═══ PHASE 1: THE CARTOGRAPHER ═══").blue().bold()
    );
    println!();

    let allowed_assets: HashSet<String> = if config.use_top100 {
        println!("{}", style(format!("Step 1.0: Loading top {} coins...", config.topn)).blue());
        match fetch_top_symbols(config.topn).await {
            Ok(symbols) => {
                println!(
                    "{} Toplist filter active: {} symbols",
                    style("✓").green(),
                    symbols.len()
                );
                symbols
            }
            Err(e) => {
                warn!("Failed to fetch top list: {}. Proceeding without filter.", e);
                HashSet::new()
            }
        }
    } else {
        HashSet::new()
    };

    println!();
    println!(
        "{}",
        style(format!("Step 1.1: Loading markets from {} venue(s)...", venues.len())).blue()
    );
    let start = Instant::now();

    let fetcher = VenueFetcher::new()?;
    let pb = spinner(&format!("Fetching {}", config.exchanges.join(", ")));
    let snapshots = join_all(venues.iter().map(|venue| fetcher.fetch_snapshot(*venue))).await;
    pb.finish_and_clear();

    println!(
        "{} Fetched {} venue(s) in {:?}",
        style("✓").green(),
        snapshots.iter().filter(|s| s.is_ok()).count(),
        start.elapsed()
    );

    // =============================================
    // PHASE 2: THE BRAIN
    // =============================================
    println!();
    println!(
        "{}",
        style("═══ PHASE 2: THE BRAIN ═══").magenta().bold()
    );
    println!();

    let mut all_opportunities: Vec<ArbitrageOpportunity> = Vec::new();

    for (venue, snapshot) in venues.iter().zip(snapshots) {
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("[{}] Skipping venue: {:?}", venue, e);
                continue;
            }
        };

        let params = config.scan_params(*venue);
        if let Err(e) = params.validate() {
            error!("[{}] Invalid scan parameters: {}", venue, e);
            continue;
        }
        println!(
            "{}",
            style(format!(
                "Step 2.1: Scanning {} (orderbook={}, fees={}, max hops={})",
                venue, params.prefer_orderbook, params.include_fees, params.max_hops
            ))
            .magenta()
        );
        let start = Instant::now();

        match scan_venue(&snapshot, &allowed_assets, &params) {
            Ok(scan) => {
                println!(
                    "{} {}: {} nodes, {} edges, {} candidates, {} profitable in {:?}",
                    style("✓").green(),
                    scan.venue,
                    scan.node_count,
                    scan.edge_count,
                    scan.filter_stats.candidates,
                    scan.opportunities.len(),
                    start.elapsed()
                );
                println!(
                    "   {} pairs: {} priced, {} one-sided, {} unpriced, {} skipped",
                    scan.edge_report.pairs_seen,
                    scan.edge_report.fully_priced,
                    scan.edge_report.partially_priced,
                    scan.edge_report.unpriced,
                    scan.edge_report.skipped_total()
                );
                all_opportunities.extend(scan.opportunities);
            }
            Err(e) => {
                error!("[{}] Invalid rate graph, venue skipped: {}", venue, e);
            }
        }
    }

    rank(&mut all_opportunities);

    // =============================================
    // RESULTS
    // =============================================
    println!();
    println!(
        "{}",
        style("═══ RESULTS ═══").green().bold()
    );
    println!();

    report::print_results(&all_opportunities);

    if all_opportunities.is_empty() {
        return Ok(());
    }

    if let Some(path) = &config.export_csv {
        match report::export_csv(path, &all_opportunities) {
            Ok(()) => println!("{} Exported CSV to {}", style("✓").green(), path),
            Err(e) => error!("CSV export failed: {:?}", e),
        }
    }

    if let Some(notifier) = TelegramNotifier::new(
        config.telegram_token.as_deref(),
        config.telegram_chat_id.as_deref(),
    ) {
        notifier.notify(&all_opportunities, scanned_at).await;
    }

    info!(
        "Scan complete: {} opportunities across {} venue(s)",
        all_opportunities.len(),
        venues.len()
    );

    Ok(())
}
