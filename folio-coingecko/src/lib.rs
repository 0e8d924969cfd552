//! CoinGecko price quotes for the Folio portfolio tracker
//!
//! This crate provides a batch price lookup backed by the public CoinGecko
//! API. A demo-plan key can be supplied through `COINGECKO_API_KEY`.

pub mod client;
pub mod types;

pub use client::{CoinGeckoClient, CoinGeckoConfig};
pub use types::{quotes_from_markets, CoinMarket};
