//! Core types for the Folio portfolio tracker
//!
//! This crate defines the shared data structures used across the workspace:
//! holdings, price quotes, valuation snapshots, the summary view model and
//! the provider traits the valuation loop depends on.

pub mod error;
pub mod holding;
pub mod provider;
pub mod quote;
pub mod summary;
pub mod valuation;

pub use error::{FolioError, FolioResult};
pub use holding::{
    baseline_value, collect_symbols, has_assets, normalize_symbol, ExchangeHoldings, Holding,
    HoldingsState,
};
pub use provider::{HoldingsProvider, PriceQuoteProvider};
pub use quote::{dedupe_symbols, PriceMap, PriceQuote};
pub use summary::{format_currency, format_percentage, PortfolioSummaryView, SummaryFigures};
pub use valuation::{
    resolve_total_value, MissReason, PortfolioSnapshot, PriceMiss, ProfitLoss, TotalOverflow,
    Valuation, ValuationView,
};
