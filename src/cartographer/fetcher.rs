//! Venue Fetcher - public REST market data
//!
//! Step 1.1: The Scout
//!
//! Pulls the market list and the book/last tickers of a venue and
//! normalizes them into a `VenueSnapshot`. No API keys needed.
//!
//! Supported venues:
//! - binance: /api/v3/exchangeInfo + /api/v3/ticker/bookTicker + /api/v3/ticker/price
//! - kucoin:  /api/v1/symbols + /api/v1/market/allTickers

use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::market::{PricedPair, VenueSnapshot, DEFAULT_TAKER_FEE};

// ============================================
// CONSTANTS
// ============================================

const BINANCE_API_URL: &str = "https://api.binance.com";
const KUCOIN_API_URL: &str = "https://api.kucoin.com";

/// Timeout for a single REST call
const API_TIMEOUT_SECS: u64 = 15;

/// KuCoin wraps every payload in `{ "code": "200000", "data": ... }`
const KUCOIN_OK: &str = "200000";

/// Venue ids accepted in EXCHANGES
pub const SUPPORTED_VENUES: &[&str] = &["binance", "kucoin"];

// ============================================
// VENUES
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Binance,
    Kucoin,
}

impl Venue {
    pub fn id(&self) -> &'static str {
        match self {
            Venue::Binance => "binance",
            Venue::Kucoin => "kucoin",
        }
    }

    /// Venue-wide taker fee when the market data carries none
    pub fn default_taker_fee(&self) -> f64 {
        match self {
            Venue::Binance => DEFAULT_TAKER_FEE,
            Venue::Kucoin => DEFAULT_TAKER_FEE,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Venue {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "binance" => Ok(Venue::Binance),
            "kucoin" => Ok(Venue::Kucoin),
            other => Err(eyre!(
                "Unsupported exchange '{}' (supported: {})",
                other,
                SUPPORTED_VENUES.join(", ")
            )),
        }
    }
}

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
pub struct BinanceExchangeInfo {
    pub symbols: Vec<BinanceSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceSymbol {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceBookTicker {
    pub symbol: String,
    pub bid_price: Option<String>,
    pub ask_price: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BinancePriceTicker {
    pub symbol: String,
    pub price: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KucoinEnvelope<T> {
    pub code: String,
    pub msg: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinSymbol {
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(default)]
    pub enable_trading: bool,
}

#[derive(Debug, Deserialize)]
pub struct KucoinTickers {
    pub ticker: Vec<KucoinTicker>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinTicker {
    pub symbol: String,
    pub buy: Option<String>,
    pub sell: Option<String>,
    pub last: Option<String>,
    pub taker_fee_rate: Option<String>,
}

// ============================================
// NORMALIZATION
// ============================================

/// Venues report prices as decimal strings; empty or garbage means absent.
/// Zero and negative values are kept so the edge builder can report them.
fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
}

/// Build a Binance snapshot from the three REST payloads
pub fn binance_snapshot(
    info: BinanceExchangeInfo,
    books: Vec<BinanceBookTicker>,
    prices: Vec<BinancePriceTicker>,
) -> VenueSnapshot {
    let books: HashMap<String, BinanceBookTicker> =
        books.into_iter().map(|b| (b.symbol.clone(), b)).collect();
    let prices: HashMap<String, Option<String>> =
        prices.into_iter().map(|p| (p.symbol, p.price)).collect();

    let mut pairs: Vec<PricedPair> = info
        .symbols
        .into_iter()
        .map(|s| {
            let mut pair = PricedPair::new(&s.base_asset, &s.quote_asset);
            pair.active = s.status == "TRADING";
            if let Some(book) = books.get(&s.symbol) {
                pair.best_bid = parse_decimal(book.bid_price.as_deref());
                pair.best_ask = parse_decimal(book.ask_price.as_deref());
            }
            pair.last_price = prices
                .get(&s.symbol)
                .and_then(|p| parse_decimal(p.as_deref()));
            pair
        })
        .collect();
    pairs.sort_by(|a, b| a.market_id.cmp(&b.market_id));

    VenueSnapshot {
        venue: Venue::Binance.id().to_string(),
        default_taker_fee: Some(Venue::Binance.default_taker_fee()),
        pairs,
    }
}

/// Build a KuCoin snapshot from the symbol list and the all-tickers payload
pub fn kucoin_snapshot(symbols: Vec<KucoinSymbol>, tickers: KucoinTickers) -> VenueSnapshot {
    let tickers: HashMap<String, KucoinTicker> = tickers
        .ticker
        .into_iter()
        .map(|t| (t.symbol.clone(), t))
        .collect();

    let mut pairs: Vec<PricedPair> = symbols
        .into_iter()
        .map(|s| {
            let mut pair = PricedPair::new(&s.base_currency, &s.quote_currency);
            pair.active = s.enable_trading;
            if let Some(t) = tickers.get(&s.symbol) {
                pair.best_bid = parse_decimal(t.buy.as_deref());
                pair.best_ask = parse_decimal(t.sell.as_deref());
                pair.last_price = parse_decimal(t.last.as_deref());
                pair.taker_fee = parse_decimal(t.taker_fee_rate.as_deref());
            }
            pair
        })
        .collect();
    pairs.sort_by(|a, b| a.market_id.cmp(&b.market_id));

    VenueSnapshot {
        venue: Venue::Kucoin.id().to_string(),
        default_taker_fee: Some(Venue::Kucoin.default_taker_fee()),
        pairs,
    }
}

fn unwrap_kucoin<T>(envelope: KucoinEnvelope<T>, what: &str) -> Result<T> {
    if envelope.code != KUCOIN_OK {
        return Err(eyre!(
            "KuCoin {} returned code {}: {}",
            what,
            envelope.code,
            envelope.msg.unwrap_or_default()
        ));
    }
    envelope
        .data
        .ok_or_else(|| eyre!("KuCoin {} returned no data", what))
}

// ============================================
// FETCHER
// ============================================

pub struct VenueFetcher {
    http_client: Client,
    binance_url: String,
    kucoin_url: String,
}

impl VenueFetcher {
    pub fn new() -> Result<Self> {
        Self::with_base_urls(BINANCE_API_URL, KUCOIN_API_URL)
    }

    pub fn with_base_urls(binance_url: &str, kucoin_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            binance_url: binance_url.trim_end_matches('/').to_string(),
            kucoin_url: kucoin_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch one snapshot of every market on `venue`
    pub async fn fetch_snapshot(&self, venue: Venue) -> Result<VenueSnapshot> {
        let start = Instant::now();

        let snapshot = match venue {
            Venue::Binance => self.fetch_binance().await,
            Venue::Kucoin => self.fetch_kucoin().await,
        }
        .wrap_err_with(|| format!("Failed to load markets from {}", venue))?;

        info!(
            "[{}] Loaded {} markets in {:?}",
            venue,
            snapshot.pairs.len(),
            start.elapsed()
        );
        Ok(snapshot)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(eyre!("{} returned HTTP {}", url, status));
        }

        response
            .json::<T>()
            .await
            .wrap_err_with(|| format!("Failed to parse response from {}", url))
    }

    async fn fetch_binance(&self) -> Result<VenueSnapshot> {
        let info_url = format!("{}/api/v3/exchangeInfo", self.binance_url);
        let book_url = format!("{}/api/v3/ticker/bookTicker", self.binance_url);
        let price_url = format!("{}/api/v3/ticker/price", self.binance_url);

        let (info, books, prices) = tokio::try_join!(
            self.get_json::<BinanceExchangeInfo>(&info_url),
            self.get_json::<Vec<BinanceBookTicker>>(&book_url),
            self.get_json::<Vec<BinancePriceTicker>>(&price_url),
        )?;

        Ok(binance_snapshot(info, books, prices))
    }

    async fn fetch_kucoin(&self) -> Result<VenueSnapshot> {
        let symbols_url = format!("{}/api/v1/symbols", self.kucoin_url);
        let tickers_url = format!("{}/api/v1/market/allTickers", self.kucoin_url);

        let (symbols, tickers) = tokio::try_join!(
            self.get_json::<KucoinEnvelope<Vec<KucoinSymbol>>>(&symbols_url),
            self.get_json::<KucoinEnvelope<KucoinTickers>>(&tickers_url),
        )?;

        Ok(kucoin_snapshot(
            unwrap_kucoin(symbols, "symbols")?,
            unwrap_kucoin(tickers, "allTickers")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_parsing() {
        assert_eq!("binance".parse::<Venue>().unwrap(), Venue::Binance);
        assert_eq!(" KuCoin ".parse::<Venue>().unwrap(), Venue::Kucoin);
        assert!("kraken".parse::<Venue>().is_err());
        assert_eq!(Venue::Kucoin.to_string(), "kucoin");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(Some("0.04950000")), Some(0.0495));
        assert_eq!(parse_decimal(Some("0.00000000")), Some(0.0));
        assert_eq!(parse_decimal(Some("")), None);
        assert_eq!(parse_decimal(Some("n/a")), None);
        assert_eq!(parse_decimal(None), None);
    }

    #[test]
    fn test_binance_snapshot() {
        let info: BinanceExchangeInfo = serde_json::from_str(
            r#"{"symbols": [
                {"symbol": "ETHBTC", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "BTC"},
                {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT"},
                {"symbol": "LUNABTC", "status": "BREAK", "baseAsset": "LUNA", "quoteAsset": "BTC"}
            ]}"#,
        )
        .unwrap();
        let books: Vec<BinanceBookTicker> = serde_json::from_str(
            r#"[
                {"symbol": "ETHBTC", "bidPrice": "0.04900000", "bidQty": "1.0", "askPrice": "0.04950000", "askQty": "2.0"},
                {"symbol": "BTCUSDT", "bidPrice": "49990.00", "bidQty": "1.0", "askPrice": "50000.00", "askQty": "1.0"}
            ]"#,
        )
        .unwrap();
        let prices: Vec<BinancePriceTicker> = serde_json::from_str(
            r#"[{"symbol": "ETHBTC", "price": "0.04920000"}, {"symbol": "LUNABTC", "price": "0.00000001"}]"#,
        )
        .unwrap();

        let snapshot = binance_snapshot(info, books, prices);
        assert_eq!(snapshot.venue, "binance");
        assert_eq!(snapshot.default_taker_fee, Some(0.001));

        let ids: Vec<&str> = snapshot.pairs.iter().map(|p| p.market_id.as_str()).collect();
        assert_eq!(ids, vec!["BTC/USDT", "ETH/BTC", "LUNA/BTC"]);

        let eth = &snapshot.pairs[1];
        assert_eq!(eth.best_bid, Some(0.049));
        assert_eq!(eth.best_ask, Some(0.0495));
        assert_eq!(eth.last_price, Some(0.0492));
        assert!(eth.active);

        let luna = &snapshot.pairs[2];
        assert!(!luna.active);
        assert_eq!(luna.best_bid, None);
    }

    #[test]
    fn test_kucoin_snapshot() {
        let symbols: KucoinEnvelope<Vec<KucoinSymbol>> = serde_json::from_str(
            r#"{"code": "200000", "data": [
                {"symbol": "ETH-BTC", "baseCurrency": "ETH", "quoteCurrency": "BTC", "enableTrading": true},
                {"symbol": "OLD-USDT", "baseCurrency": "OLD", "quoteCurrency": "USDT", "enableTrading": false}
            ]}"#,
        )
        .unwrap();
        let tickers: KucoinEnvelope<KucoinTickers> = serde_json::from_str(
            r#"{"code": "200000", "data": {"time": 1700000000000, "ticker": [
                {"symbol": "ETH-BTC", "buy": "0.049", "sell": "0.0495", "last": "0.0492", "takerFeeRate": "0.001"},
                {"symbol": "OLD-USDT", "buy": null, "sell": null, "last": null, "takerFeeRate": "0.002"}
            ]}}"#,
        )
        .unwrap();

        let snapshot = kucoin_snapshot(
            unwrap_kucoin(symbols, "symbols").unwrap(),
            unwrap_kucoin(tickers, "allTickers").unwrap(),
        );
        assert_eq!(snapshot.venue, "kucoin");
        assert_eq!(snapshot.pairs.len(), 2);

        let eth = &snapshot.pairs[0];
        assert_eq!(eth.market_id, "ETH/BTC");
        assert_eq!(eth.best_bid, Some(0.049));
        assert_eq!(eth.taker_fee, Some(0.001));

        let old = &snapshot.pairs[1];
        assert!(!old.active);
        assert_eq!(old.last_price, None);
        assert_eq!(old.taker_fee, Some(0.002));
    }

    #[test]
    fn test_kucoin_error_envelope() {
        let envelope: KucoinEnvelope<Vec<KucoinSymbol>> =
            serde_json::from_str(r#"{"code": "429000", "msg": "Too many requests"}"#).unwrap();
        let err = unwrap_kucoin(envelope, "symbols").unwrap_err();
        assert!(err.to_string().contains("429000"));
    }
}
