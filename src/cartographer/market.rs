//! Market snapshot value objects
//!
//! The fixed schema every venue fetcher normalizes into. The graph builder
//! never sees venue-specific JSON.

use std::fmt;

/// Fallback taker fee when neither the pair nor the venue reports one (10 bps)
pub const DEFAULT_TAKER_FEE: f64 = 0.001;

/// One tradable base/quote market with whatever prices the venue gave us
#[derive(Debug, Clone, PartialEq)]
pub struct PricedPair {
    /// Unified market id, e.g. "ETH/BTC"
    pub market_id: String,
    pub base: String,
    pub quote: String,
    pub active: bool,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub last_price: Option<f64>,
    /// Taker fee as a fraction (0.001 = 10 bps)
    pub taker_fee: Option<f64>,
}

impl PricedPair {
    pub fn new(base: &str, quote: &str) -> Self {
        let base = base.trim().to_uppercase();
        let quote = quote.trim().to_uppercase();
        Self {
            market_id: format!("{}/{}", base, quote),
            base,
            quote,
            active: true,
            best_bid: None,
            best_ask: None,
            last_price: None,
            taker_fee: None,
        }
    }

    pub fn with_book(mut self, bid: f64, ask: f64) -> Self {
        self.best_bid = Some(bid);
        self.best_ask = Some(ask);
        self
    }

    pub fn with_last(mut self, last: f64) -> Self {
        self.last_price = Some(last);
        self
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.taker_fee = Some(fee);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Every priced pair of one venue, taken at one moment
#[derive(Debug, Clone, Default)]
pub struct VenueSnapshot {
    pub venue: String,
    /// Venue-wide taker fee used when a pair carries none
    pub default_taker_fee: Option<f64>,
    pub pairs: Vec<PricedPair>,
}

impl VenueSnapshot {
    pub fn new(venue: &str, pairs: Vec<PricedPair>) -> Self {
        Self {
            venue: venue.to_string(),
            default_taker_fee: None,
            pairs,
        }
    }
}

/// Resolved price for one direction of a pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quote {
    Priced(f64),
    Unavailable(UnavailableReason),
}

/// Why a direction produced no edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnavailableReason {
    /// Neither the book side nor the last trade was reported
    Missing,
    /// The best candidate price was zero, negative or NaN
    NonPositive(f64),
    /// Fee adjustment left nothing (fee >= 100% or non-finite)
    FeeConsumesRate,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::Missing => write!(f, "no bid/ask or last price"),
            UnavailableReason::NonPositive(p) => write!(f, "non-positive price {}", p),
            UnavailableReason::FeeConsumesRate => write!(f, "fee leaves no positive rate"),
        }
    }
}

/// Pick the price for one direction: the book side when preferred and
/// positive, otherwise the last trade.
pub fn resolve_quote(book_side: Option<f64>, last: Option<f64>, prefer_book: bool) -> Quote {
    let book_side = if prefer_book { book_side } else { None };

    if let Some(p) = book_side.filter(|p| *p > 0.0 && p.is_finite()) {
        return Quote::Priced(p);
    }
    if let Some(p) = last.filter(|p| *p > 0.0 && p.is_finite()) {
        return Quote::Priced(p);
    }

    match book_side.or(last) {
        Some(p) => Quote::Unavailable(UnavailableReason::NonPositive(p)),
        None => Quote::Unavailable(UnavailableReason::Missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_preferred_over_last() {
        assert_eq!(resolve_quote(Some(101.0), Some(100.0), true), Quote::Priced(101.0));
    }

    #[test]
    fn test_last_used_when_book_disabled() {
        assert_eq!(resolve_quote(Some(101.0), Some(100.0), false), Quote::Priced(100.0));
    }

    #[test]
    fn test_falls_back_to_last_on_bad_book() {
        assert_eq!(resolve_quote(Some(0.0), Some(100.0), true), Quote::Priced(100.0));
        assert_eq!(resolve_quote(None, Some(100.0), true), Quote::Priced(100.0));
    }

    #[test]
    fn test_unavailable_reasons() {
        assert_eq!(
            resolve_quote(None, None, true),
            Quote::Unavailable(UnavailableReason::Missing)
        );
        assert_eq!(
            resolve_quote(Some(-1.0), None, true),
            Quote::Unavailable(UnavailableReason::NonPositive(-1.0))
        );
    }

    #[test]
    fn test_pair_ids_are_uppercase() {
        let pair = PricedPair::new("eth", " btc");
        assert_eq!(pair.market_id, "ETH/BTC");
        assert_eq!(pair.base, "ETH");
        assert!(pair.active);
    }
}
