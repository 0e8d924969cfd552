//! API route definitions

mod health;
mod portfolio;

use axum::Router;
use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(portfolio::routes())
        .merge(health::routes())
}
