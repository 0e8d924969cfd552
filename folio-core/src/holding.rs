//! Holdings grouped by exchange

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single asset position on a single exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Exchange this position is held on
    pub exchange_id: String,

    /// Ticker symbol (e.g., "BTC")
    pub symbol: String,

    /// Number of units held
    pub quantity: Decimal,

    /// Last known value of the whole position
    pub current_value: Decimal,

    /// What was paid for the position
    pub cost_basis: Decimal,

    /// When the provider last touched this position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Holding {
    /// Create a holding whose last known value equals its cost basis
    pub fn new(
        exchange_id: impl Into<String>,
        symbol: impl Into<String>,
        quantity: Decimal,
        cost_basis: Decimal,
    ) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            symbol: symbol.into(),
            quantity,
            current_value: cost_basis,
            cost_basis,
            last_updated: None,
        }
    }

    /// Override the last known value
    pub fn with_current_value(mut self, current_value: Decimal) -> Self {
        self.current_value = current_value;
        self
    }
}

/// All holdings on one exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeHoldings {
    pub exchange_id: String,
    pub name: String,
    pub assets: Vec<Holding>,
}

impl ExchangeHoldings {
    pub fn new(exchange_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            name: name.into(),
            assets: Vec::new(),
        }
    }

    /// Add a position to this exchange
    pub fn with_asset(mut self, holding: Holding) -> Self {
        self.assets.push(holding);
        self
    }

    /// Sum of the last known values on this exchange; `None` on overflow
    pub fn current_value(&self) -> Option<Decimal> {
        self.assets
            .iter()
            .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.current_value))
    }
}

/// What the holdings provider last reported
#[derive(Debug, Clone, PartialEq)]
pub enum HoldingsState {
    /// Nothing loaded yet
    Loading,
    Ready {
        exchanges: Arc<Vec<ExchangeHoldings>>,
        loaded_at: DateTime<Utc>,
    },
    /// The provider failed; surfaced to the user with a retry affordance
    Failed { message: String },
}

impl HoldingsState {
    pub fn ready(exchanges: Vec<ExchangeHoldings>) -> Self {
        HoldingsState::Ready {
            exchanges: Arc::new(exchanges),
            loaded_at: Utc::now(),
        }
    }

    /// Loaded exchanges, if any
    pub fn exchanges(&self) -> Option<&Arc<Vec<ExchangeHoldings>>> {
        match self {
            HoldingsState::Ready { exchanges, .. } => Some(exchanges),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, HoldingsState::Failed { .. })
    }
}

/// Upper-case, trimmed symbol used as the key of a price map
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Every symbol held across all exchanges, in holding order.
///
/// Duplicates are kept; price providers dedupe the request themselves.
pub fn collect_symbols(exchanges: &[ExchangeHoldings]) -> Vec<String> {
    exchanges
        .iter()
        .flat_map(|exchange| exchange.assets.iter().map(|asset| asset.symbol.clone()))
        .collect()
}

/// Whether there is at least one asset to value
pub fn has_assets(exchanges: &[ExchangeHoldings]) -> bool {
    exchanges.iter().any(|e| !e.assets.is_empty())
}

/// Sum of last known values across every exchange; `None` on overflow
pub fn baseline_value(exchanges: &[ExchangeHoldings]) -> Option<Decimal> {
    exchanges
        .iter()
        .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.current_value()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Vec<ExchangeHoldings> {
        vec![
            ExchangeHoldings::new("binance", "Binance")
                .with_asset(Holding::new("binance", "BTC", dec!(0.5), dec!(20000)))
                .with_asset(Holding::new("binance", "eth", dec!(2), dec!(3000))),
            ExchangeHoldings::new("kraken", "Kraken")
                .with_asset(Holding::new("kraken", "BTC", dec!(0.1), dec!(4000))),
            ExchangeHoldings::new("empty", "Empty"),
        ]
    }

    #[test]
    fn test_collect_symbols_keeps_duplicates() {
        let symbols = collect_symbols(&sample());
        assert_eq!(symbols, vec!["BTC", "eth", "BTC"]);
    }

    #[test]
    fn test_baseline_value() {
        assert_eq!(baseline_value(&sample()), Some(dec!(27000)));
    }

    #[test]
    fn test_baseline_value_overflow() {
        let half = Decimal::MAX / dec!(2) + dec!(1);
        let exchanges = vec![
            ExchangeHoldings::new("a", "A").with_asset(Holding::new("a", "BTC", dec!(1), half)),
            ExchangeHoldings::new("b", "B").with_asset(Holding::new("b", "BTC", dec!(1), half)),
        ];
        assert_eq!(exchanges[0].current_value(), Some(half));
        assert_eq!(baseline_value(&exchanges), None);
    }

    #[test]
    fn test_has_assets() {
        assert!(has_assets(&sample()));
        assert!(!has_assets(&[ExchangeHoldings::new("empty", "Empty")]));
        assert!(!has_assets(&[]));
    }

    #[test]
    fn test_holdings_state_exchanges() {
        assert!(HoldingsState::Loading.exchanges().is_none());
        let failed = HoldingsState::Failed { message: "boom".to_string() };
        assert!(failed.is_failed());
        assert!(failed.exchanges().is_none());

        let ready = HoldingsState::ready(sample());
        assert_eq!(ready.exchanges().map(|e| e.len()), Some(3));
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" eth "), "ETH");
    }
}
