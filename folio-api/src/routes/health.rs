//! Health check endpoints

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use folio_core::PortfolioSummaryView;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    holdings: &'static str,
    offline: bool,
    last_valuation: Option<DateTime<Utc>>,
}

/// Health check handler
///
/// Degraded while the holdings provider is unreachable.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (holdings, offline) = match state.portfolio.summary() {
        PortfolioSummaryView::Loading => ("loading", false),
        PortfolioSummaryView::Error { offline, .. } => ("failed", offline),
        PortfolioSummaryView::Ready(_) => ("ready", false),
    };

    let (code, status) = if offline {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    let response = HealthResponse {
        status,
        holdings,
        offline,
        last_valuation: state.portfolio.valuation().last_updated_from_api,
    };

    (code, Json(response))
}

/// Simple liveness check (always returns OK if server is running)
async fn liveness() -> &'static str {
    "OK"
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
}
