//! Portfolio summary view model
//!
//! Combines the holdings state, the user's settings and the latest
//! valuation into the single structure a summary card renders.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::holding::{baseline_value, HoldingsState};
use crate::valuation::{ProfitLoss, ValuationView};

/// Headline figures of a loaded portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryFigures {
    pub total_value: Decimal,
    pub initial_capital: Decimal,
    /// Absolute profit or loss; see `is_profit` for the sign
    pub profit_loss: Decimal,
    /// Absolute percentage of the initial capital
    pub profit_loss_percentage: Decimal,
    pub is_profit: bool,
    pub formatted_total_value: String,
    pub formatted_initial_capital: String,
    pub formatted_profit_loss: String,
    /// Signed, e.g. "+111.00%"
    pub formatted_percentage: String,
    /// When the holdings were loaded
    pub last_updated: Option<DateTime<Utc>>,
    /// When live prices were last folded in
    pub last_updated_from_api: Option<DateTime<Utc>>,
    pub is_updating: bool,
}

/// State of the summary card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PortfolioSummaryView {
    Loading,
    Error {
        message: String,
        offline: bool,
        /// Retry is disabled while offline
        retry_enabled: bool,
    },
    Ready(SummaryFigures),
}

impl PortfolioSummaryView {
    pub fn build(
        holdings: &HoldingsState,
        initial_capital: Decimal,
        is_offline: bool,
        valuation: &ValuationView,
    ) -> Self {
        let (exchanges, loaded_at) = match holdings {
            HoldingsState::Failed { message } => {
                return PortfolioSummaryView::Error {
                    message: message.clone(),
                    offline: is_offline,
                    retry_enabled: !is_offline,
                };
            }
            HoldingsState::Loading => return PortfolioSummaryView::Loading,
            HoldingsState::Ready {
                exchanges,
                loaded_at,
            } => (exchanges, *loaded_at),
        };

        // Before the first published snapshot the last known values are all we have
        let total_value = match valuation.snapshot.as_ref() {
            Some(snapshot) => snapshot.total_value,
            None => match baseline_value(exchanges) {
                Some(total) => total,
                None => {
                    return PortfolioSummaryView::Error {
                        message: "Portfolio value is out of range".to_string(),
                        offline: is_offline,
                        retry_enabled: !is_offline,
                    };
                }
            },
        };

        // Profit/loss always tracks the current initial capital, not the one
        // in effect when the snapshot was computed
        let pnl = ProfitLoss::compute(total_value, initial_capital);
        let is_profit = pnl.is_profit();
        let sign = if is_profit { "+" } else { "-" };

        PortfolioSummaryView::Ready(SummaryFigures {
            total_value,
            initial_capital,
            profit_loss: pnl.amount.abs(),
            profit_loss_percentage: pnl.percentage.abs(),
            is_profit,
            formatted_total_value: format_currency(total_value),
            formatted_initial_capital: format_currency(initial_capital),
            formatted_profit_loss: format_currency(pnl.amount.abs()),
            formatted_percentage: format!(
                "{}{}",
                sign,
                format_percentage(pnl.percentage.abs())
            ),
            last_updated: Some(loaded_at),
            last_updated_from_api: valuation.last_updated_from_api,
            is_updating: valuation.is_updating,
        })
    }
}

/// Format a USD amount as `$1,234.56`
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, fraction)
}

/// Format a percentage with two decimals, e.g. `12.34%`
pub fn format_percentage(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}%", rounded)
}
