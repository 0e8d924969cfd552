//! Service error types

use std::time::Duration;

use rust_decimal::Decimal;

use folio_core::{FolioError, TotalOverflow};

/// Why a valuation cycle ended without publishing
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error("Price fetch failed: {0}")]
    PriceFetch(#[from] FolioError),

    #[error("Price request timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Overflow(#[from] TotalOverflow),
}

/// Rejected change to the portfolio inputs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("Initial capital cannot be negative: {0}")]
    NegativeCapital(Decimal),
}

/// Rejected holdings retry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("Cannot retry while offline")]
    Offline,

    #[error("Holdings loader has stopped")]
    Stopped,
}
