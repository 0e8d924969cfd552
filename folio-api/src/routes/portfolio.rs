//! Portfolio endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use folio_services::RetryError;

use crate::AppState;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// False when the request was folded into a running cycle
    pub scheduled: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InitialCapitalBody {
    pub initial_capital: Decimal,
}

/// Create portfolio routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/portfolio/summary", get(get_summary))
        .route("/portfolio/valuation", get(get_valuation))
        .route("/portfolio/refresh", post(request_refresh))
        .route("/portfolio/holdings/retry", post(retry_holdings))
        .route("/portfolio/initial-capital", put(set_initial_capital))
}

/// Summary card state
async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.portfolio.summary())
}

/// Latest published valuation
async fn get_valuation(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.portfolio.valuation())
}

/// Ask for a valuation cycle now
async fn request_refresh(State(state): State<AppState>) -> impl IntoResponse {
    let scheduled = state.portfolio.request_refresh();
    info!("Manual refresh requested (scheduled: {})", scheduled);
    (StatusCode::ACCEPTED, Json(RefreshResponse { scheduled }))
}

/// Reload holdings after a failure
async fn retry_holdings(State(state): State<AppState>) -> impl IntoResponse {
    match state.portfolio.retry_holdings() {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            warn!("Holdings retry rejected: {}", e);
            let code = match e {
                RetryError::Offline => StatusCode::CONFLICT,
                RetryError::Stopped => StatusCode::SERVICE_UNAVAILABLE,
            };
            (
                code,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Change the capital profit/loss is measured against
async fn set_initial_capital(
    State(state): State<AppState>,
    Json(body): Json<InitialCapitalBody>,
) -> impl IntoResponse {
    match state.portfolio.set_initial_capital(body.initial_capital) {
        Ok(()) => Json(body).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    use folio_core::{
        ExchangeHoldings, FolioError, FolioResult, Holding, HoldingsProvider, PriceMap,
        PriceQuote, PriceQuoteProvider,
    };
    use folio_services::{PortfolioService, PortfolioServiceConfig};

    struct StaticPrices;

    #[async_trait]
    impl PriceQuoteProvider for StaticPrices {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn get_prices(&self, _symbols: &[String]) -> FolioResult<PriceMap> {
            Ok([PriceQuote::new("BTC", dec!(42000))].into_iter().collect())
        }
    }

    struct StaticHoldings(FolioResult<Vec<ExchangeHoldings>>);

    #[async_trait]
    impl HoldingsProvider for StaticHoldings {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn get_holdings(&self) -> FolioResult<Vec<ExchangeHoldings>> {
            self.0.clone()
        }
    }

    fn app(holdings: FolioResult<Vec<ExchangeHoldings>>) -> Router {
        let portfolio = PortfolioService::start(
            Arc::new(StaticPrices),
            Arc::new(StaticHoldings(holdings)),
            PortfolioServiceConfig {
                initial_capital: dec!(10000),
                ..Default::default()
            },
        );

        routes().with_state(AppState {
            portfolio: Arc::new(portfolio),
        })
    }

    fn btc() -> Vec<ExchangeHoldings> {
        vec![ExchangeHoldings::new("binance", "Binance").with_asset(
            Holding::new("binance", "BTC", dec!(0.5), dec!(15000)).with_current_value(dec!(20000)),
        )]
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_reports_valuation() {
        let app = app(Ok(btc()));
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let response = app
            .oneshot(Request::get("/portfolio/summary").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["state"], "ready");
        assert_eq!(body["formatted_total_value"], "$21,000.00");
        assert_eq!(body["formatted_percentage"], "+110.00%");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_conflicts_while_offline() {
        let app = app(Err(FolioError::network("unreachable")));
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        let response = app
            .oneshot(
                Request::post("/portfolio/holdings/retry")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_initial_capital_validation() {
        let app = app(Ok(btc()));

        let response = app
            .clone()
            .oneshot(
                Request::put("/portfolio/initial-capital")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"initial_capital":"-10"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(
                Request::put("/portfolio/initial-capital")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"initial_capital":"25000"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["initial_capital"], "25000");
    }

    #[tokio::test]
    async fn test_refresh_is_accepted() {
        let app = app(Ok(btc()));

        let response = app
            .oneshot(Request::post("/portfolio/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
