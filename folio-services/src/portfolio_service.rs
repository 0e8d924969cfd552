//! Portfolio service
//!
//! Wires the holdings loader and the valuation refresher to a shared set of
//! portfolio inputs and exposes the summary the API serves.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use folio_core::{HoldingsProvider, PortfolioSummaryView, PriceQuoteProvider, ValuationView};

use crate::error::{InputError, RetryError};
use crate::holdings_loader::{HoldingsLoader, HoldingsLoaderConfig, HoldingsLoaderHandle};
use crate::inputs::{InputsHandle, PortfolioInputs};
use crate::valuation_refresher::{RefresherConfig, RefresherHandle, ValuationRefresher};

#[derive(Debug, Clone, Default)]
pub struct PortfolioServiceConfig {
    pub initial_capital: Decimal,
    pub refresher: RefresherConfig,
    pub holdings: HoldingsLoaderConfig,
}

/// Running portfolio: holdings loader plus valuation refresher
pub struct PortfolioService {
    inputs: InputsHandle,
    loader: HoldingsLoaderHandle,
    refresher: RefresherHandle,
}

impl PortfolioService {
    /// Spawn both background loops
    pub fn start(
        prices: Arc<dyn PriceQuoteProvider>,
        holdings: Arc<dyn HoldingsProvider>,
        config: PortfolioServiceConfig,
    ) -> Self {
        info!(
            "Starting portfolio service (prices: {}, holdings: {})",
            prices.name(),
            holdings.name()
        );

        let inputs = InputsHandle::new(PortfolioInputs::new(config.initial_capital));
        let refresher =
            ValuationRefresher::new(prices, inputs.subscribe(), config.refresher).spawn();
        let loader = HoldingsLoader::new(holdings, inputs.clone(), config.holdings).spawn();

        Self {
            inputs,
            loader,
            refresher,
        }
    }

    pub fn summary(&self) -> PortfolioSummaryView {
        let inputs = self.inputs.current();
        PortfolioSummaryView::build(
            &inputs.holdings,
            inputs.initial_capital,
            inputs.is_offline,
            &self.refresher.view(),
        )
    }

    pub fn valuation(&self) -> ValuationView {
        self.refresher.view()
    }

    pub fn request_refresh(&self) -> bool {
        self.refresher.request_refresh()
    }

    pub fn retry_holdings(&self) -> Result<(), RetryError> {
        self.loader.retry()
    }

    pub fn initial_capital(&self) -> Decimal {
        self.inputs.current().initial_capital
    }

    pub fn set_initial_capital(&self, initial_capital: Decimal) -> Result<(), InputError> {
        self.inputs.set_initial_capital(initial_capital)?;
        info!("Initial capital set to {}", initial_capital);
        Ok(())
    }

    /// Stop both loops. A valuation still waiting on prices never publishes.
    pub async fn shutdown(self) {
        self.refresher.shutdown().await;
        self.loader.shutdown().await;
        info!("Portfolio service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use folio_core::{
        ExchangeHoldings, FolioError, FolioResult, Holding, PriceMap, PriceQuote,
    };

    struct FixedPrices;

    #[async_trait]
    impl PriceQuoteProvider for FixedPrices {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn get_prices(&self, _symbols: &[String]) -> FolioResult<PriceMap> {
            Ok([
                PriceQuote::new("BTC", dec!(42000)),
                PriceQuote::new("ETH", dec!(3000)),
            ]
            .into_iter()
            .collect())
        }
    }

    struct FixedHoldings(FolioResult<Vec<ExchangeHoldings>>);

    #[async_trait]
    impl HoldingsProvider for FixedHoldings {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn get_holdings(&self) -> FolioResult<Vec<ExchangeHoldings>> {
            self.0.clone()
        }
    }

    fn holdings() -> Vec<ExchangeHoldings> {
        vec![ExchangeHoldings::new("binance", "Binance")
            .with_asset(Holding::new("binance", "BTC", dec!(0.5), dec!(15000)))
            .with_asset(Holding::new("binance", "ETH", dec!(2), dec!(3000)))]
    }

    fn start(holdings: FolioResult<Vec<ExchangeHoldings>>) -> PortfolioService {
        PortfolioService::start(
            Arc::new(FixedPrices),
            Arc::new(FixedHoldings(holdings)),
            PortfolioServiceConfig {
                initial_capital: dec!(10000),
                ..Default::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_after_first_cycle() {
        let service = start(Ok(holdings()));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let PortfolioSummaryView::Ready(figures) = service.summary() else {
            panic!("expected a loaded summary, got {:?}", service.summary());
        };
        assert_eq!(figures.total_value, dec!(27000));
        assert_eq!(figures.profit_loss, dec!(17000));
        assert!(figures.is_profit);
        assert_eq!(figures.formatted_percentage, "+170.00%");
        assert!(figures.last_updated_from_api.is_some());

        service.set_initial_capital(dec!(30000)).unwrap();
        let PortfolioSummaryView::Ready(figures) = service.summary() else {
            panic!("expected a loaded summary");
        };
        assert!(!figures.is_profit);
        assert_eq!(figures.formatted_profit_loss, "$3,000.00");

        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_summary_disables_retry() {
        let service = start(Err(FolioError::network("unreachable")));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(
            service.summary(),
            PortfolioSummaryView::Error {
                message: "Network error: unreachable".to_string(),
                offline: true,
                retry_enabled: false,
            }
        );
        assert_eq!(service.retry_holdings(), Err(RetryError::Offline));
        assert!(service.valuation().snapshot.is_none());

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_negative_capital_rejected() {
        let service = start(Ok(holdings()));
        assert!(service.set_initial_capital(dec!(-5)).is_err());
        assert_eq!(service.initial_capital(), dec!(10000));
        service.shutdown().await;
    }
}
