//! Configuration for hopscan
//!
//! Layering, lowest to highest:
//! 1. built-in defaults
//! 2. `config/.env`, then `.env` (never overriding the real environment)
//! 3. environment variables, or a TOML file when `--config` is given
//! 4. command line flags

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::cartographer::{Venue, SUPPORTED_VENUES};
use crate::scanner::ScanParams;

// ============================================
// DEFAULTS
// ============================================

pub const DEFAULT_EXCHANGES: &str = "binance";
pub const DEFAULT_BASE_ASSETS: &str = "BTC,ETH,USDT";
pub const DEFAULT_MAX_HOPS: usize = 5;
pub const DEFAULT_MIN_PROFIT_BPS: f64 = 10.0;
pub const DEFAULT_TOPN: usize = 100;

// ============================================
// COMMAND LINE
// ============================================

#[derive(Debug, Default, Parser)]
#[command(
    name = "hopscan",
    version,
    about = "Multi-hop crypto arbitrage finder (intra-exchange)"
)]
pub struct Args {
    /// Comma-separated exchange ids (e.g. binance,kucoin)
    #[arg(long)]
    pub exchanges: Option<String>,

    /// Start/end base assets in priority order (e.g. BTC,ETH,USDT)
    #[arg(long)]
    pub bases: Option<String>,

    /// Max cycle length in hops
    #[arg(long)]
    pub max_hops: Option<usize>,

    /// Min profit to report, in bps
    #[arg(long, allow_negative_numbers = true)]
    pub min_profit_bps: Option<f64>,

    /// Price with order book bid/ask
    #[arg(long, conflicts_with = "no_use_orderbook")]
    pub use_orderbook: bool,

    /// Price with last trade only
    #[arg(long)]
    pub no_use_orderbook: bool,

    /// Write the results to this CSV file
    #[arg(long)]
    pub export_csv: Option<String>,

    /// Disable the market-cap toplist filter
    #[arg(long)]
    pub no_top100: bool,

    /// How many top coins to allow
    #[arg(long)]
    pub topn: Option<usize>,

    /// Load settings from a TOML file instead of the environment
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective settings to a TOML file and exit
    #[arg(long, value_name = "PATH")]
    pub write_config: Option<PathBuf>,
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Venues ==========
    /// Exchange ids, lowercase
    pub exchanges: Vec<String>,

    // ========== Path Finding ==========
    /// Start/end assets in priority order, uppercase. Empty allows any start.
    pub base_assets: Vec<String>,

    /// Maximum cycle length in edges
    pub max_hops: usize,

    /// Minimum real profit to report
    pub min_profit_bps: f64,

    // ========== Pricing ==========
    /// Bid/ask when available, else last trade
    pub use_orderbook: bool,

    /// Apply taker fees to every edge
    pub include_fees: bool,

    // ========== Asset Filter ==========
    pub use_top100: bool,
    pub topn: usize,

    // ========== Output ==========
    pub export_csv: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchanges: parse_list(DEFAULT_EXCHANGES, false),
            base_assets: parse_list(DEFAULT_BASE_ASSETS, true),
            max_hops: DEFAULT_MAX_HOPS,
            min_profit_bps: DEFAULT_MIN_PROFIT_BPS,
            use_orderbook: true,
            include_fees: true,
            use_top100: true,
            topn: DEFAULT_TOPN,
            export_csv: None,
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

/// Load `config/.env`, then `.env`. Existing variables win.
pub fn load_dotenv() {
    dotenvy::from_path("config/.env").ok();
    dotenvy::dotenv().ok();
}

/// `1/true/yes/y/on` (any case) is true, anything else false
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Comma-separated list, trimmed, empties and duplicates removed
pub fn parse_list(value: &str, uppercase: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let item = if uppercase {
            item.to_uppercase()
        } else {
            item.to_lowercase()
        };
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables and .env files
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Ok(Self::from_vars(|key| env::var(key).ok()))
    }

    /// Build from any key lookup. Unparseable numbers fall back to the default.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let number = |key: &str, default: f64| -> f64 {
            match lookup(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!("{}={:?} is not a number, using {}", key, raw, default);
                    default
                }),
                None => default,
            }
        };
        let count = |key: &str, default: usize| -> usize {
            match lookup(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!("{}={:?} is not a count, using {}", key, raw, default);
                    default
                }),
                None => default,
            }
        };
        let flag = |key: &str, default: bool| lookup(key).map(|v| parse_bool(&v)).unwrap_or(default);

        Self {
            exchanges: lookup("EXCHANGES")
                .map(|s| parse_list(&s, false))
                .unwrap_or(defaults.exchanges),
            base_assets: lookup("BASE_ASSETS")
                .map(|s| parse_list(&s, true))
                .unwrap_or(defaults.base_assets),
            max_hops: count("MAX_HOPS", defaults.max_hops),
            min_profit_bps: number("MIN_PROFIT_BPS", defaults.min_profit_bps),
            use_orderbook: flag("USE_ORDERBOOK", defaults.use_orderbook),
            include_fees: flag("INCLUDE_FEES", defaults.include_fees),
            use_top100: flag("USE_TOP100", defaults.use_top100),
            topn: count("TOPN", defaults.topn),
            export_csv: non_empty(lookup("EXPORT_CSV")),
            telegram_token: non_empty(lookup("TELEGRAM_TOKEN")),
            telegram_chat_id: non_empty(lookup("TELEGRAM_CHAT_ID")),
        }
    }

    /// Environment (or `--config` file) with command line flags on top
    pub fn load(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => {
                load_dotenv();
                Self::from_file(path)?
            }
            None => Self::from_env()?,
        };
        config.apply_args(args);
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(exchanges) = &args.exchanges {
            self.exchanges = parse_list(exchanges, false);
        }
        if let Some(bases) = &args.bases {
            self.base_assets = parse_list(bases, true);
        }
        if let Some(max_hops) = args.max_hops {
            self.max_hops = max_hops;
        }
        if let Some(bps) = args.min_profit_bps {
            self.min_profit_bps = bps;
        }
        if args.use_orderbook {
            self.use_orderbook = true;
        }
        if args.no_use_orderbook {
            self.use_orderbook = false;
        }
        if let Some(path) = non_empty(args.export_csv.clone()) {
            self.export_csv = Some(path);
        }
        if args.no_top100 {
            self.use_top100 = false;
        }
        if let Some(topn) = args.topn {
            self.topn = topn;
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))?;

        config.exchanges = parse_list(&config.exchanges.join(","), false);
        config.base_assets = parse_list(&config.base_assets.join(","), true);
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parsed venue list
    pub fn venues(&self) -> Result<Vec<Venue>> {
        self.exchanges.iter().map(|id| id.parse()).collect()
    }

    pub fn telegram_ready(&self) -> bool {
        self.telegram_token.is_some() && self.telegram_chat_id.is_some()
    }

    /// Detection parameters for one venue
    pub fn scan_params(&self, venue: Venue) -> ScanParams {
        ScanParams {
            venue: venue.id().to_string(),
            max_hops: self.max_hops,
            min_profit_bps: self.min_profit_bps,
            base_assets: self.base_assets.clone(),
            prefer_orderbook: self.use_orderbook,
            include_fees: self.include_fees,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.exchanges.is_empty() {
            return Err(eyre!(
                "EXCHANGES is empty - set at least one of: {}",
                SUPPORTED_VENUES.join(", ")
            ));
        }
        self.venues()?;

        if self.max_hops < 2 {
            return Err(eyre!(
                "MAX_HOPS must be at least 2 (currently {})",
                self.max_hops
            ));
        }
        if !self.min_profit_bps.is_finite() {
            return Err(eyre!("MIN_PROFIT_BPS must be a finite number"));
        }
        if self.use_top100 && self.topn == 0 {
            return Err(eyre!("TOPN must be at least 1 when the toplist filter is on"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let on_off = |b: bool| if b { "✓ Enabled" } else { "✗ Disabled" };
        let bases = if self.base_assets.is_empty() {
            "any".to_string()
        } else {
            self.base_assets.join(",")
        };

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║                 HOPSCAN - CONFIGURATION                    ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Exchanges:         {:^40} ║", self.exchanges.join(","));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ PATH FINDING                                               ║");
        println!("║ • Base Assets:     {:^40} ║", bases);
        println!("║ • Max Hops:        {:^40} ║", self.max_hops);
        println!("║ • Min Profit:      {:^40} ║", format!("{:.1} bps", self.min_profit_bps));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ PRICING                                                    ║");
        println!("║ • Order Book:      {:^40} ║", on_off(self.use_orderbook));
        println!("║ • Taker Fees:      {:^40} ║", on_off(self.include_fees));
        println!("║ • Top-N Filter:    {:^40} ║",
            if self.use_top100 { format!("✓ Top {}", self.topn) } else { "✗ Disabled".to_string() }
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ OUTPUT                                                     ║");
        println!("║ • CSV Export:      {:^40} ║", self.export_csv.as_deref().unwrap_or("✗ Not Set"));
        println!("║ • Telegram:        {:^40} ║",
            if self.telegram_ready() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

// ============================================
// TESTS
// ============================================
