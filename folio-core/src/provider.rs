//! Interfaces of the external data providers
//!
//! The valuation refresher only ever talks to these traits; concrete
//! HTTP clients live in their own crates.

use async_trait::async_trait;

use crate::error::FolioResult;
use crate::holding::ExchangeHoldings;
use crate::quote::PriceMap;

/// Batch lookup of current prices
#[async_trait]
pub trait PriceQuoteProvider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Resolve prices for many symbols in one round trip.
    ///
    /// Symbols may repeat. Unknown symbols are omitted from the map rather
    /// than failing the call.
    async fn get_prices(&self, symbols: &[String]) -> FolioResult<PriceMap>;
}

/// Source of the user's holdings
#[async_trait]
pub trait HoldingsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every exchange with its assets
    async fn get_holdings(&self) -> FolioResult<Vec<ExchangeHoldings>>;
}
