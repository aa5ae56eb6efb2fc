//! Route definitions for the acadex API

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

// Dispute routes
pub fn dispute_routes() -> Router<AppState> {
    Router::new()
        .route("/api/disputes/resolve", post(resolve_dispute))
        .route("/api/disputes/my", get(get_my_disputes))
        .route("/api/disputes/search", get(search_disputes))
        .route("/api/disputes/:id", get(get_dispute))
        .route("/api/disputes/:id/admin", get(get_dispute_admin))
}

// Ledger routes
pub fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ledger/my", get(get_my_ledger))
        .route("/api/ledger/search", get(search_ledger))
        .route("/api/ledger/:user_id", get(get_user_ledger))
}
