//! Acadex Backend Server
//!
//! Marketplace backend centered on the dispute settlement engine: admin
//! resolution of purchase and custom-request disputes with ledger-backed
//! balance settlement, plus dispute and ledger read endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use acadex_server::app_state::AppState;
use acadex_server::auth::AuthKeys;
use acadex_server::config::AppConfig;
use acadex_server::dispute_service::DisputeService;
use acadex_server::health_routes;
use acadex_server::ledger::LedgerService;
use acadex_server::routes;
use acadex_server::settlement::{SettlementRates, SettlementService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let rates = SettlementRates {
        commission: config.commission_rate,
        penalty: config.penalty_rate,
    };

    let state = AppState::new(
        Arc::new(SettlementService::new(
            pool.clone(),
            rates,
            config.platform_account_id,
        )),
        Arc::new(DisputeService::new(pool.clone())),
        Arc::new(LedgerService::new(pool)),
        AuthKeys::new(&config.jwt_secret),
    );

    let app = Router::new()
        .merge(health_routes())
        .merge(routes::dispute_routes())
        .merge(routes::ledger_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_allowed_origins));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
