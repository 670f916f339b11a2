//! Telegram notifications
//!
//! Posts the best few opportunities of a run to a chat. A failed send is
//! logged and ignored.

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::brain::ArbitrageOpportunity;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

const API_TIMEOUT_SECS: u64 = 15;

/// Rows included in one message
pub const TOP_ROWS: usize = 3;

pub struct TelegramNotifier {
    http_client: Client,
    api_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// `None` unless both token and chat id are set
    pub fn new(token: Option<&str>, chat_id: Option<&str>) -> Option<Self> {
        let token = token.map(str::trim).filter(|t| !t.is_empty())?;
        let chat_id = chat_id.map(str::trim).filter(|c| !c.is_empty())?;

        let http_client = match Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("Telegram disabled, HTTP client failed: {}", e);
                return None;
            }
        };

        Some(Self {
            http_client,
            api_url: TELEGRAM_API_URL.to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// Send the top rows. Never fails the run.
    pub async fn notify(&self, opportunities: &[ArbitrageOpportunity], scanned_at: DateTime<Utc>) {
        let Some(text) = format_message(opportunities, scanned_at) else {
            debug!("Nothing to notify");
            return;
        };

        match self.send_message(&text).await {
            Ok(()) => info!("Telegram: sent top {} cycles", opportunities.len().min(TOP_ROWS)),
            Err(e) => warn!("Telegram notification failed: {}", e),
        }
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self.http_client.post(&url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            return Err(eyre!(
                "sendMessage returned HTTP {}: {}",
                status,
                body["description"].as_str().unwrap_or("no description")
            ));
        }

        Ok(())
    }
}

/// Message body for the best `TOP_ROWS` opportunities, `None` when empty
pub fn format_message(
    opportunities: &[ArbitrageOpportunity],
    scanned_at: DateTime<Utc>,
) -> Option<String> {
    if opportunities.is_empty() {
        return None;
    }

    let lines: Vec<String> = opportunities
        .iter()
        .take(TOP_ROWS)
        .map(|opp| {
            format!(
                "{}: +{:.2} bps | {} | {}",
                opp.venue,
                opp.profit_bps,
                opp.format_assets(),
                opp.format_markets()
            )
        })
        .collect();

    Some(format!(
        "Arb cycles ({}):\n{}",
        scanned_at.format("%Y-%m-%d %H:%M:%S UTC"),
        lines.join("\n")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opportunity(venue: &str, bps: f64) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            venue: venue.to_string(),
            start_asset: "BTC".to_string(),
            hop_count: 2,
            profit_bps: bps,
            asset_path: vec!["BTC".into(), "ETH".into(), "BTC".into()],
            market_path: vec!["ETH/BTC".into(), "ETH/BTC".into()],
        }
    }

    #[test]
    fn test_disabled_without_credentials() {
        assert!(TelegramNotifier::new(None, Some("1")).is_none());
        assert!(TelegramNotifier::new(Some("token"), Some("  ")).is_none());
    }

    #[test]
    fn test_message_has_top_three() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let opps = vec![
            opportunity("binance", 40.0),
            opportunity("kucoin", 30.0),
            opportunity("binance", 20.0),
            opportunity("kucoin", 10.0),
        ];
        let text = format_message(&opps, at).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Arb cycles (2024-05-01 12:00:00 UTC):");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "binance: +40.00 bps | BTC → ETH → BTC | ETH/BTC | ETH/BTC");
        assert!(!text.contains("+10.00"));
    }

    #[test]
    fn test_no_message_when_empty() {
        assert!(format_message(&[], Utc::now()).is_none());
    }
}
