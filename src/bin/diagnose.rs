//! Diagnostic tool - Check configuration status
//!
//! Run with: cargo run --bin diagnose

use std::env;

const SUPPORTED_VENUES: &[&str] = &["binance", "kucoin"];

fn is_true(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn set(key: &str) -> bool {
    env::var(key).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn main() {
    println!("🔍 HOPSCAN DIAGNOSTIC CHECK\n");

    // Same order as the scanner
    dotenvy::from_path("config/.env").ok();
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("EXCHANGES", "binance", "Venues to scan"),
        ("BASE_ASSETS", "BTC,ETH,USDT", "Start/end assets, in priority order"),
        ("MAX_HOPS", "5", "Maximum hops in cycle"),
        ("MIN_PROFIT_BPS", "10", "Minimum profit to report (bps)"),
        ("USE_ORDERBOOK", "true", "Price with bid/ask?"),
        ("INCLUDE_FEES", "true", "Apply taker fees?"),
        ("USE_TOP100", "true", "Restrict to top coins by market cap?"),
        ("TOPN", "100", "Size of the toplist"),
        ("EXPORT_CSV", "", "CSV output path"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let marker = if env::var(key).is_err() { "(default)" } else { "(from env)" };
        let shown = if value.is_empty() { "<unset>" } else { value.as_str() };
        println!("  {}: {} {}", key, shown, marker);
        println!("    └─ {}\n", desc);
    }

    println!("═══════════════════════════════════════════════════");
    println!("                     VENUES                         ");
    println!("═══════════════════════════════════════════════════\n");

    let exchanges = env::var("EXCHANGES").unwrap_or_else(|_| "binance".to_string());
    let mut all_supported = true;
    for id in exchanges.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let supported = SUPPORTED_VENUES.contains(&id.to_lowercase().as_str());
        all_supported &= supported;
        println!("  {:<12} {}", id, if supported { "✅ Supported" } else { "❌ Unsupported" });
    }

    let max_hops: usize = env::var("MAX_HOPS")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);
    if max_hops < 2 {
        println!("\n  ⚠️  MAX_HOPS must be at least 2 (currently {})", max_hops);
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("                  NOTIFICATIONS                     ");
    println!("═══════════════════════════════════════════════════\n");

    let token = set("TELEGRAM_TOKEN");
    let chat = set("TELEGRAM_CHAT_ID");
    println!("  TELEGRAM_TOKEN:   {}", if token { "✅ Set" } else { "❌ Not set" });
    println!("  TELEGRAM_CHAT_ID: {}", if chat { "✅ Set" } else { "❌ Not set" });
    if token != chat {
        println!("\n  ⚠️  Telegram needs both token and chat id; notifications stay off.");
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("                  WHAT TO EXPECT                    ");
    println!("═══════════════════════════════════════════════════\n");

    let min_bps: f64 = env::var("MIN_PROFIT_BPS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10.0);
    let fees = env::var("INCLUDE_FEES").map(|v| is_true(&v)).unwrap_or(true);

    println!("  With MIN_PROFIT_BPS = {:.1}:", min_bps);
    println!("  • Liquid venues rarely show loops above fees");
    println!("  • A 3-hop loop pays ~30 bps in taker fees at 10 bps per leg");
    if !fees {
        println!("\n  ⚠️  INCLUDE_FEES is off. Reported profits ignore trading fees.");
    }
    if min_bps <= 0.0 {
        println!("\n  ⚠️  Non-positive threshold! Every profitable-looking loop is reported.");
    }

    if all_supported {
        println!("\n✅ Diagnostic complete!\n");
    } else {
        println!("\n❌ Fix EXCHANGES before running the scanner.\n");
    }
}
