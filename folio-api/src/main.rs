//! Folio API Server
//!
//! HTTP API server that keeps a crypto portfolio valued against live prices.

mod config;
mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use folio_coingecko::CoinGeckoClient;
use folio_services::PortfolioService;
use folio_supabase::SupabaseClient;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub portfolio: Arc<PortfolioService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,folio_api=debug,folio_services=debug")),
        )
        .init();

    info!("Starting Folio API");

    let config = AppConfig::from_env()?;

    if config.coingecko.api_key.is_some() {
        info!("CoinGecko API key found in environment");
    } else {
        info!("No CoinGecko API key found - using the public rate limit");
    }

    // Initialize clients
    let prices = CoinGeckoClient::with_config(config.coingecko.clone())?;
    let holdings = SupabaseClient::new(config.supabase.clone())?;

    // Start holdings loader and valuation refresher
    let portfolio = Arc::new(PortfolioService::start(
        Arc::new(prices),
        Arc::new(holdings),
        config.portfolio.clone(),
    ));

    let state = AppState {
        portfolio: Arc::clone(&portfolio),
    };

    // Configure CORS for frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Build router
    let app = Router::new()
        .nest("/api", routes::api_routes())
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Tear down the background loops; a valuation still in flight is dropped
    match Arc::try_unwrap(portfolio) {
        Ok(portfolio) => portfolio.shutdown().await,
        Err(_) => warn!("Portfolio service still shared at exit"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
