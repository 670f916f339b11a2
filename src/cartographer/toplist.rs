//! Market-cap toplist
//!
//! Restricts the graph to the top-N coins by market cap (CoinGecko).
//! Majors are always allowed so the usual base assets survive the filter.

use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

const COINGECKO_MARKETS_URL: &str = "https://api.coingecko.com/api/v3/coins/markets";

const API_TIMEOUT_SECS: u64 = 15;

/// CoinGecko serves at most 250 rows per page
const MAX_PER_PAGE: usize = 250;

/// Always part of the allow-list
pub const MAJORS: &[&str] = &["BTC", "ETH", "USDT", "USDC"];

#[derive(Debug, Deserialize)]
struct CoinMarket {
    symbol: Option<String>,
}

/// Uppercase tickers of the rows, plus the majors
fn allow_list(rows: Vec<CoinMarket>) -> HashSet<String> {
    rows.into_iter()
        .filter_map(|row| row.symbol)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .chain(MAJORS.iter().map(|s| s.to_string()))
        .collect()
}

/// Fetch the top `topn` symbols by market cap
pub async fn fetch_top_symbols(topn: usize) -> Result<HashSet<String>> {
    if topn == 0 {
        return Err(eyre!("TOPN must be at least 1"));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(API_TIMEOUT_SECS))
        .build()
        .wrap_err("Failed to create HTTP client")?;

    let per_page = topn.min(MAX_PER_PAGE);
    let pages = topn.div_ceil(per_page);
    let mut rows = Vec::with_capacity(topn);

    for page in 1..=pages {
        debug!("CoinGecko markets page {} ({} per page)", page, per_page);
        let batch: Vec<CoinMarket> = client
            .get(COINGECKO_MARKETS_URL)
            .query(&[
                ("vs_currency", "usd".to_string()),
                ("order", "market_cap_desc".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("sparkline", "false".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err("Failed to parse CoinGecko response")?;

        let done = batch.len() < per_page;
        rows.extend(batch);
        if done {
            break;
        }
    }
    rows.truncate(topn);

    Ok(allow_list(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_uppercases_and_adds_majors() {
        let rows: Vec<CoinMarket> = serde_json::from_str(
            r#"[{"id": "solana", "symbol": "sol"}, {"id": "x", "symbol": ""}, {"id": "y"}, {"symbol": "btc"}]"#,
        )
        .unwrap();
        let allowed = allow_list(rows);

        assert!(allowed.contains("SOL"));
        assert!(!allowed.contains(""));
        for major in MAJORS {
            assert!(allowed.contains(*major));
        }
        assert_eq!(allowed.len(), 5);
    }

    #[tokio::test]
    async fn test_zero_topn_rejected() {
        assert!(fetch_top_symbols(0).await.is_err());
    }
}
