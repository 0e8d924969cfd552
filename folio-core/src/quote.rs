//! Price quotes returned by a batch lookup

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::holding::normalize_symbol;

/// Current price for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub current_price: Decimal,
}

impl PriceQuote {
    pub fn new(symbol: impl Into<String>, current_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            current_price,
        }
    }
}

/// Quotes keyed by normalised symbol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceMap {
    quotes: HashMap<String, PriceQuote>,
}

impl PriceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quote; the first quote for a symbol wins
    pub fn insert(&mut self, quote: PriceQuote) {
        self.quotes
            .entry(normalize_symbol(&quote.symbol))
            .or_insert(quote);
    }

    /// Look up the quote for a symbol, case-insensitively
    pub fn get(&self, symbol: &str) -> Option<&PriceQuote> {
        self.quotes.get(&normalize_symbol(symbol))
    }

    /// A usable price for the symbol; zero or negative prices count as missing
    pub fn usable_price(&self, symbol: &str) -> Option<Decimal> {
        self.get(symbol)
            .map(|q| q.current_price)
            .filter(|p| *p > Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl FromIterator<PriceQuote> for PriceMap {
    fn from_iter<I: IntoIterator<Item = PriceQuote>>(iter: I) -> Self {
        let mut map = PriceMap::new();
        for quote in iter {
            map.insert(quote);
        }
        map
    }
}

/// Deduplicate symbols case-insensitively, keeping first-seen order
pub fn dedupe_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    symbols
        .iter()
        .map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
