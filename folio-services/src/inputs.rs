//! Portfolio inputs
//!
//! Holdings, initial capital and the offline flag reach the valuation
//! refresher through a single watch channel. The refresher only ever reads
//! it; the holdings loader and the API write to it.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::debug;

use folio_core::{has_assets, ExchangeHoldings, HoldingsState};

use crate::error::InputError;

/// Everything a valuation cycle needs besides prices
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioInputs {
    pub holdings: HoldingsState,
    pub initial_capital: Decimal,
    pub is_offline: bool,
}

impl PortfolioInputs {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            holdings: HoldingsState::Loading,
            initial_capital,
            is_offline: false,
        }
    }

    /// Holdings worth pricing, if any
    pub fn priceable_holdings(&self) -> Option<&Arc<Vec<ExchangeHoldings>>> {
        self.holdings
            .exchanges()
            .filter(|exchanges| has_assets(exchanges))
    }
}

/// Write side of the inputs channel
#[derive(Clone)]
pub struct InputsHandle {
    tx: Arc<watch::Sender<PortfolioInputs>>,
}

impl InputsHandle {
    pub fn new(initial: PortfolioInputs) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<PortfolioInputs> {
        self.tx.subscribe()
    }

    /// Copy of the current inputs
    pub fn current(&self) -> PortfolioInputs {
        self.tx.borrow().clone()
    }

    /// Publish a new holdings state.
    ///
    /// A reload that returns the same holdings only bumps the load time and
    /// does not wake subscribers.
    pub fn set_holdings(&self, state: HoldingsState) {
        self.tx.send_if_modified(|inputs| {
            let unchanged = match (&inputs.holdings, &state) {
                (
                    HoldingsState::Ready { exchanges: old, .. },
                    HoldingsState::Ready { exchanges: new, .. },
                ) => old == new,
                (old, new) => old == new,
            };

            inputs.holdings = state;
            if unchanged {
                debug!("Holdings unchanged, not notifying subscribers");
            }
            !unchanged
        });
    }

    pub fn set_initial_capital(&self, initial_capital: Decimal) -> Result<(), InputError> {
        if initial_capital < Decimal::ZERO {
            return Err(InputError::NegativeCapital(initial_capital));
        }

        self.tx.send_if_modified(|inputs| {
            if inputs.initial_capital == initial_capital {
                return false;
            }
            inputs.initial_capital = initial_capital;
            true
        });
        Ok(())
    }

    pub fn set_offline(&self, is_offline: bool) {
        self.tx.send_if_modified(|inputs| {
            if inputs.is_offline == is_offline {
                return false;
            }
            inputs.is_offline = is_offline;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Holding;
    use rust_decimal_macros::dec;

    fn exchanges() -> Vec<ExchangeHoldings> {
        vec![ExchangeHoldings::new("e1", "Binance")
            .with_asset(Holding::new("e1", "BTC", dec!(1), dec!(100)))]
    }

    #[test]
    fn test_priceable_holdings() {
        let mut inputs = PortfolioInputs::new(dec!(0));
        assert!(inputs.priceable_holdings().is_none());

        inputs.holdings = HoldingsState::ready(vec![ExchangeHoldings::new("e1", "Empty")]);
        assert!(inputs.priceable_holdings().is_none());

        inputs.holdings = HoldingsState::ready(exchanges());
        assert!(inputs.priceable_holdings().is_some());
    }

    #[test]
    fn test_negative_capital_rejected() {
        let handle = InputsHandle::new(PortfolioInputs::new(dec!(100)));
        assert!(matches!(
            handle.set_initial_capital(dec!(-1)),
            Err(InputError::NegativeCapital(_))
        ));
        assert_eq!(handle.current().initial_capital, dec!(100));

        handle.set_initial_capital(dec!(0)).unwrap();
        assert_eq!(handle.current().initial_capital, dec!(0));
    }

    #[tokio::test]
    async fn test_identical_reload_does_not_notify() {
        let handle = InputsHandle::new(PortfolioInputs::new(dec!(0)));
        let mut rx = handle.subscribe();

        handle.set_holdings(HoldingsState::ready(exchanges()));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        handle.set_holdings(HoldingsState::ready(exchanges()));
        assert!(!rx.has_changed().unwrap());

        handle.set_offline(false);
        assert!(!rx.has_changed().unwrap());

        handle.set_offline(true);
        assert!(rx.has_changed().unwrap());
        assert!(handle.current().is_offline);
    }
}
