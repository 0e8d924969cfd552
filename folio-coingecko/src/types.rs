//! CoinGecko API response types
//!
//! These mirror the `/coins/markets` response and are folded into
//! folio-core price maps.

use rust_decimal::Decimal;
use serde::Deserialize;

use folio_core::{PriceMap, PriceQuote};

/// Public API base
pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Header carrying a demo-plan API key
pub const DEMO_API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// One row of GET /coins/markets
#[derive(Debug, Clone, Deserialize)]
pub struct CoinMarket {
    /// CoinGecko coin id (e.g., "bitcoin")
    pub id: String,

    /// Lower-case ticker (e.g., "btc")
    pub symbol: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Price in the requested currency; null for delisted coins
    #[serde(default)]
    pub current_price: Option<Decimal>,

    #[serde(default)]
    pub market_cap: Option<Decimal>,

    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Error body CoinGecko returns on 4xx
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<CoinGeckoStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoStatus {
    #[serde(default)]
    pub error_message: Option<String>,
}

impl CoinGeckoErrorBody {
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref().or_else(|| {
            self.status
                .as_ref()
                .and_then(|s| s.error_message.as_deref())
        })
    }
}

/// Fold market rows into a price map.
///
/// Rows arrive ordered by market cap, so when several coins share a ticker
/// the largest one is kept. Rows without a price are dropped.
pub fn quotes_from_markets(markets: Vec<CoinMarket>) -> PriceMap {
    markets
        .into_iter()
        .filter_map(|m| {
            m.current_price
                .map(|price| PriceQuote::new(m.symbol.to_uppercase(), price))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_markets_response() {
        let json = r#"
        [
            {
                "id": "bitcoin",
                "symbol": "btc",
                "name": "Bitcoin",
                "current_price": 42000.5,
                "market_cap": 820000000000,
                "last_updated": "2024-01-10T12:00:00.000Z"
            },
            {
                "id": "ethereum",
                "symbol": "eth",
                "name": "Ethereum",
                "current_price": 2500
            }
        ]
        "#;

        let markets: Vec<CoinMarket> = serde_json::from_str(json).unwrap();
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].id, "bitcoin");
        assert_eq!(markets[0].current_price, Some(dec!(42000.5)));
        assert!(markets[1].market_cap.is_none());

        let prices = quotes_from_markets(markets);
        assert_eq!(prices.usable_price("BTC"), Some(dec!(42000.5)));
        assert_eq!(prices.usable_price("eth"), Some(dec!(2500)));
    }

    #[test]
    fn test_null_price_is_dropped() {
        let json = r#"[{"id": "dead-coin", "symbol": "dead", "current_price": null}]"#;
        let markets: Vec<CoinMarket> = serde_json::from_str(json).unwrap();

        let prices = quotes_from_markets(markets);
        assert!(prices.is_empty());
    }

    #[test]
    fn test_largest_coin_wins_shared_ticker() {
        let json = r#"
        [
            {"id": "uniswap", "symbol": "uni", "current_price": 6.5},
            {"id": "uni-imposter", "symbol": "uni", "current_price": 0.5}
        ]
        "#;
        let markets: Vec<CoinMarket> = serde_json::from_str(json).unwrap();

        let prices = quotes_from_markets(markets);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices.usable_price("UNI"), Some(dec!(6.5)));
    }

    #[test]
    fn test_error_body_message() {
        let rate_limited: CoinGeckoErrorBody = serde_json::from_str(
            r#"{"status": {"error_code": 429, "error_message": "You've exceeded the Rate Limit"}}"#,
        )
        .unwrap();
        assert_eq!(rate_limited.message(), Some("You've exceeded the Rate Limit"));

        let plain: CoinGeckoErrorBody =
            serde_json::from_str(r#"{"error": "invalid vs_currency"}"#).unwrap();
        assert_eq!(plain.message(), Some("invalid vs_currency"));
    }
}
