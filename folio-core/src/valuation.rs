//! Portfolio valuation math
//!
//! Folds a batch of price quotes into the holdings to produce a total
//! value, then derives profit/loss against the configured initial capital.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::holding::ExchangeHoldings;
use crate::quote::PriceMap;

/// Why an asset was valued at its last known value instead of a fresh price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// The batch response had no usable quote for the symbol
    NoQuote,
    /// `quantity * price` did not fit in a decimal
    Overflow,
}

/// An asset that fell back to its last known value
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMiss {
    pub exchange_id: String,
    pub symbol: String,
    pub reason: MissReason,
    pub fallback_value: Decimal,
}

/// Result of folding prices into the holdings
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub total_value: Decimal,
    /// Number of assets valued with a fresh quote
    pub priced: usize,
    pub misses: Vec<PriceMiss>,
}

/// The summed portfolio value does not fit in a decimal
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Portfolio total exceeds the decimal range")]
pub struct TotalOverflow;

/// Value every asset on every exchange.
///
/// An asset with a usable quote is worth `quantity * price`; anything else
/// contributes its last known `current_value`. No asset is ever dropped, so a
/// sum that overflows fails the whole valuation.
pub fn resolve_total_value(
    exchanges: &[ExchangeHoldings],
    prices: &PriceMap,
) -> Result<Valuation, TotalOverflow> {
    let mut total_value = Decimal::ZERO;
    let mut priced = 0;
    let mut misses = Vec::new();

    for exchange in exchanges {
        for asset in &exchange.assets {
            let fresh = match prices.usable_price(&asset.symbol) {
                Some(price) => asset.quantity.checked_mul(price).ok_or(MissReason::Overflow),
                None => Err(MissReason::NoQuote),
            };

            match fresh {
                Ok(value) => {
                    total_value = total_value.checked_add(value).ok_or(TotalOverflow)?;
                    priced += 1;
                }
                Err(reason) => {
                    total_value = total_value
                        .checked_add(asset.current_value)
                        .ok_or(TotalOverflow)?;
                    misses.push(PriceMiss {
                        exchange_id: asset.exchange_id.clone(),
                        symbol: asset.symbol.clone(),
                        reason,
                        fallback_value: asset.current_value,
                    });
                }
            }
        }
    }

    Ok(Valuation {
        total_value,
        priced,
        misses,
    })
}

/// Profit/loss of a total value against the initial capital
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub amount: Decimal,
    /// Percentage of the initial capital; zero when there is no capital
    pub percentage: Decimal,
}

impl ProfitLoss {
    pub fn compute(total_value: Decimal, initial_capital: Decimal) -> Self {
        let amount = total_value.saturating_sub(initial_capital);
        let percentage = if initial_capital > Decimal::ZERO {
            amount
                .checked_div(initial_capital)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        Self { amount, percentage }
    }

    pub fn is_profit(&self) -> bool {
        self.amount >= Decimal::ZERO
    }
}

/// Valuation of the whole portfolio at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value: Decimal,
    pub total_profit_loss: Decimal,
    pub profit_loss_percentage: Decimal,
    /// When the computation finished
    pub computed_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn new(total_value: Decimal, initial_capital: Decimal, computed_at: DateTime<Utc>) -> Self {
        let pnl = ProfitLoss::compute(total_value, initial_capital);
        Self {
            total_value,
            total_profit_loss: pnl.amount,
            profit_loss_percentage: pnl.percentage,
            computed_at,
        }
    }
}

/// What the refresher exposes to the display layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationView {
    /// Latest published snapshot, `None` until the first successful cycle
    pub snapshot: Option<PortfolioSnapshot>,
    /// True while a cycle is running
    pub is_updating: bool,
    pub last_updated_from_api: Option<DateTime<Utc>>,
}

impl ValuationView {
    /// Replace the snapshot with a freshly computed one
    pub fn published(snapshot: PortfolioSnapshot) -> Self {
        Self {
            last_updated_from_api: Some(snapshot.computed_at),
            snapshot: Some(snapshot),
            is_updating: false,
        }
    }
}
