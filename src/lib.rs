//! Acadex Backend Library
//!
//! This library exports the core modules for the acadex backend server:
//! the dispute settlement engine, its ledger and timeline primitives, and
//! the read surface around them.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod dispute_service;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod settlement;
pub mod timeline;

use axum::{routing::get, Router};

async fn root() -> &'static str {
    "Acadex API Server"
}

async fn health_check() -> &'static str {
    "OK"
}

/// Liveness routes; generic over state so they merge anywhere.
pub fn health_routes<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}
