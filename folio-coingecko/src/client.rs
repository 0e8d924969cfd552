//! CoinGecko API client
//!
//! Resolves current prices for a batch of ticker symbols with a single
//! call to the `/coins/markets` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};

use folio_core::{dedupe_symbols, FolioError, FolioResult, PriceMap, PriceQuoteProvider};

use crate::types::{
    quotes_from_markets, CoinGeckoErrorBody, CoinMarket, COINGECKO_API_BASE, DEMO_API_KEY_HEADER,
};

/// Most rows a single page of `/coins/markets` returns
const MAX_PER_PAGE: usize = 250;

/// Settings for the CoinGecko client
#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    /// Demo-plan API key, sent as a header when present
    pub api_key: Option<String>,
    /// Currency prices are quoted in
    pub vs_currency: String,
    /// Upper bound on a whole batch request
    pub timeout: Duration,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_API_BASE.to_string(),
            api_key: None,
            vs_currency: "usd".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// CoinGecko API client
#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    config: CoinGeckoConfig,
}

impl CoinGeckoClient {
    pub fn with_config(config: CoinGeckoConfig) -> FolioResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("Folio/1.0")
            .build()
            .map_err(|e| FolioError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the markets URL for an already deduplicated symbol list
    fn markets_url(&self, symbols: &[String]) -> String {
        let symbols = symbols
            .iter()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "{}/coins/markets?vs_currency={}&symbols={}&order=market_cap_desc&per_page={}&page=1",
            self.config.base_url.trim_end_matches('/'),
            self.config.vs_currency,
            urlencoding::encode(&symbols),
            MAX_PER_PAGE
        )
    }

    /// Fetch market rows for the given symbols
    #[instrument(skip(self), fields(count = symbols.len()))]
    pub async fn fetch_markets(&self, symbols: &[String]) -> FolioResult<Vec<CoinMarket>> {
        let url = self.markets_url(symbols);
        debug!("Fetching CoinGecko markets from: {}", url);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            request = request.header(DEMO_API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(map_request_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FolioError::provider("coingecko", "rate limited"));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<CoinGeckoErrorBody>(&body)
                .ok()
                .and_then(|b| b.message().map(str::to_string))
                .unwrap_or(body);
            return Err(FolioError::api(format!(
                "CoinGecko API error ({}): {}",
                status, message
            )));
        }

        response
            .json::<Vec<CoinMarket>>()
            .await
            .map_err(|e| FolioError::parse(format!("Failed to parse markets response: {}", e)))
    }
}

#[async_trait]
impl PriceQuoteProvider for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn get_prices(&self, symbols: &[String]) -> FolioResult<PriceMap> {
        let unique = dedupe_symbols(symbols);
        if unique.is_empty() {
            return Ok(PriceMap::new());
        }

        let markets = self.fetch_markets(&unique).await?;
        let prices = quotes_from_markets(markets);

        info!(
            "[CoinGecko] Priced {}/{} symbols",
            prices.len(),
            unique.len()
        );

        Ok(prices)
    }
}

fn map_request_error(e: reqwest::Error) -> FolioError {
    if e.is_timeout() {
        FolioError::timeout(format!("CoinGecko request timed out: {}", e))
    } else {
        FolioError::network(format!("Failed to fetch prices: {}", e))
    }
}
