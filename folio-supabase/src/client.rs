//! Supabase REST client
//!
//! Reads the user's exchanges and assets through the PostgREST API that
//! Supabase exposes under `/rest/v1`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use folio_core::{ExchangeHoldings, FolioError, FolioResult, HoldingsProvider};

use crate::types::{group_holdings, AssetRow, ExchangeRow, PostgrestError};

const EXCHANGES_SELECT: &str = "exchanges?select=id,name,logo_url&order=name.asc";
const ASSETS_SELECT: &str =
    "assets?select=id,exchange_id,symbol,quantity,purchase_price_avg,last_updated&order=symbol.asc";

/// Credentials for a Supabase project
#[derive(Clone, Debug)]
pub struct SupabaseCredentials {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Anon (or service) key, sent as `apikey`
    pub anon_key: String,
    /// User access token; falls back to the anon key
    pub access_token: Option<String>,
}

impl SupabaseCredentials {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            access_token: None,
        }
    }

    /// Create credentials from environment variables
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").ok()?;
        let access_token = std::env::var("SUPABASE_ACCESS_TOKEN").ok();

        Some(Self {
            url,
            anon_key,
            access_token,
        })
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}

/// Supabase REST client
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    credentials: SupabaseCredentials,
}

impl SupabaseClient {
    pub fn new(credentials: SupabaseCredentials) -> FolioResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FolioError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.credentials.url.trim_end_matches('/'),
            path
        )
    }

    async fn get_rows<T: DeserializeOwned>(&self, path: &str) -> FolioResult<Vec<T>> {
        let url = self.rest_url(path);
        debug!("Fetching Supabase rows from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.credentials.anon_key)
            .bearer_auth(self.credentials.bearer())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FolioError::timeout(format!("Supabase request timed out: {}", e))
                } else {
                    FolioError::network(format!("Failed to reach Supabase: {}", e))
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FolioError::not_found(format!("Table not found: {}", path)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PostgrestError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(FolioError::api(format!(
                "Supabase API error ({}): {}",
                status, message
            )));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| FolioError::parse(format!("Failed to parse {} rows: {}", path, e)))
    }

    /// List exchanges
    #[instrument(skip(self))]
    pub async fn list_exchanges(&self) -> FolioResult<Vec<ExchangeRow>> {
        self.get_rows(EXCHANGES_SELECT).await
    }

    /// List assets across every exchange
    #[instrument(skip(self))]
    pub async fn list_assets(&self) -> FolioResult<Vec<AssetRow>> {
        self.get_rows(ASSETS_SELECT).await
    }
}

#[async_trait]
impl HoldingsProvider for SupabaseClient {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn get_holdings(&self) -> FolioResult<Vec<ExchangeHoldings>> {
        let (exchanges, assets) = tokio::try_join!(self.list_exchanges(), self.list_assets())?;

        let asset_rows = assets.len();
        let holdings = group_holdings(exchanges, assets);
        info!(
            "Loaded {} asset rows across {} exchanges",
            asset_rows,
            holdings.len()
        );

        Ok(holdings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_url() {
        let client =
            SupabaseClient::new(SupabaseCredentials::new("https://demo.supabase.co/", "anon"))
                .unwrap();
        assert_eq!(
            client.rest_url(EXCHANGES_SELECT),
            "https://demo.supabase.co/rest/v1/exchanges?select=id,name,logo_url&order=name.asc"
        );
    }

    #[test]
    fn test_bearer_falls_back_to_anon_key() {
        let mut credentials = SupabaseCredentials::new("https://demo.supabase.co", "anon");
        assert_eq!(credentials.bearer(), "anon");

        credentials.access_token = Some("user-jwt".to_string());
        assert_eq!(credentials.bearer(), "user-jwt");
    }

    #[tokio::test]
    async fn test_unreachable_project_is_network_error() {
        let client =
            SupabaseClient::new(SupabaseCredentials::new("http://127.0.0.1:1", "anon")).unwrap();

        let err = client.get_holdings().await.unwrap_err();
        assert!(err.is_network(), "unexpected error: {:?}", err);
    }
}
