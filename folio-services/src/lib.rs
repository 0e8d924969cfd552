//! Services for the Folio portfolio tracker
//!
//! This crate runs the background loops that keep the portfolio current:
//! the holdings loader and the valuation refresher, joined by a shared
//! set of portfolio inputs.

pub mod error;
pub mod holdings_loader;
pub mod inputs;
pub mod portfolio_service;
pub mod valuation_refresher;

pub use error::{InputError, RefreshError, RetryError};
pub use holdings_loader::{HoldingsLoader, HoldingsLoaderConfig, HoldingsLoaderHandle};
pub use inputs::{InputsHandle, PortfolioInputs};
pub use portfolio_service::{PortfolioService, PortfolioServiceConfig};
pub use valuation_refresher::{
    CycleOutcome, RefresherConfig, RefresherHandle, SkipReason, ValuationRefresher,
};
