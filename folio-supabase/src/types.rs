//! Supabase REST row types
//!
//! These mirror the `exchanges` and `assets` tables as PostgREST returns
//! them and are converted to folio-core holdings.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use folio_core::{ExchangeHoldings, Holding};

/// Row of the `exchanges` table
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Row of the `assets` table
///
/// Quantities and prices are stored as decimal strings.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRow {
    pub id: String,
    pub exchange_id: String,
    pub symbol: String,
    pub quantity: String,
    pub purchase_price_avg: String,
    /// Raw timestamp; parsed leniently in `to_holding`
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl AssetRow {
    /// Convert to a holding valued at its cost basis.
    ///
    /// Returns `None` when a decimal column does not parse.
    pub fn to_holding(&self) -> Option<Holding> {
        let quantity = parse_decimal(&self.quantity)?;
        let avg_price = parse_decimal(&self.purchase_price_avg)?;
        let cost_basis = quantity.checked_mul(avg_price)?;

        let mut holding = Holding::new(&self.exchange_id, &self.symbol, quantity, cost_basis);
        holding.last_updated = self.last_updated.as_deref().and_then(parse_timestamp);
        Some(holding)
    }
}

/// PostgREST error body
#[derive(Debug, Clone, Deserialize)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub hint: Option<String>,
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Parse a PostgREST timestamp.
///
/// Accepts RFC 3339 and offset-less `timestamp` columns, which are taken
/// as UTC. Anything else is dropped rather than failing the row.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"));
    match naive {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            debug!("Ignoring unparseable last_updated {:?}: {}", raw, e);
            None
        }
    }
}

/// Group asset rows under their exchanges.
///
/// Exchanges keep the order the API returned them in; exchanges without
/// assets are kept. Assets pointing at an unknown exchange get a group
/// named after the exchange id. Rows with malformed decimals are skipped.
pub fn group_holdings(exchanges: Vec<ExchangeRow>, assets: Vec<AssetRow>) -> Vec<ExchangeHoldings> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped: Vec<ExchangeHoldings> = Vec::with_capacity(exchanges.len());

    for exchange in exchanges {
        index.insert(exchange.id.clone(), grouped.len());
        grouped.push(ExchangeHoldings::new(exchange.id, exchange.name));
    }

    for asset in assets {
        let Some(holding) = asset.to_holding() else {
            warn!(
                "Skipping asset {} ({}): unparseable quantity {:?} or price {:?}",
                asset.id, asset.symbol, asset.quantity, asset.purchase_price_avg
            );
            continue;
        };

        let slot = *index.entry(asset.exchange_id.clone()).or_insert_with(|| {
            grouped.push(ExchangeHoldings::new(
                asset.exchange_id.clone(),
                asset.exchange_id.clone(),
            ));
            grouped.len() - 1
        });

        grouped[slot].assets.push(holding);
    }

    grouped
}
