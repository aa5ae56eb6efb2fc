//! API handlers for the acadex backend

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::{AuthUser, RESOLVE_DISPUTES, SHOW_TRANSACTIONS};
use crate::error::AppError;
use crate::models::{
    ApiResponse, Dispute, DisputeWithRole, LedgerEntry, ResolveDisputeRequest,
    ResolveDisputeResponse, SearchDisputesQuery, SearchLedgerQuery,
};

// ===== Dispute Handlers =====

/// Apply an admin action to a dispute
pub async fn resolve_dispute(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ResolveDisputeRequest>,
) -> Result<Json<ApiResponse<ResolveDisputeResponse>>, AppError> {
    user.require(RESOLVE_DISPUTES)?;
    payload.validate()?;

    let response = state
        .settlement_service
        .resolve(
            payload.dispute_id,
            &payload.solution,
            payload.admin_action,
            user.id,
        )
        .await?;

    Ok(Json(ApiResponse::ok(response)))
}

/// Disputes the caller is a party to
pub async fn get_my_disputes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<DisputeWithRole>>>, AppError> {
    let disputes = state.dispute_service.list_for_user(user.id).await?;
    Ok(Json(ApiResponse::ok(disputes)))
}

/// Admin dispute search
pub async fn search_disputes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchDisputesQuery>,
) -> Result<Json<ApiResponse<Vec<Dispute>>>, AppError> {
    user.require(RESOLVE_DISPUTES)?;
    let disputes = state.dispute_service.search(query).await?;
    Ok(Json(ApiResponse::ok(disputes)))
}

/// A single dispute, visible to its parties
pub async fn get_dispute(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Dispute>>, AppError> {
    let dispute = state.dispute_service.get_for_user(id, user.id).await?;
    Ok(Json(ApiResponse::ok(dispute)))
}

/// A single dispute for admins
pub async fn get_dispute_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Dispute>>, AppError> {
    user.require(RESOLVE_DISPUTES)?;
    let dispute = state.dispute_service.get(id).await?;
    Ok(Json(ApiResponse::ok(dispute)))
}

// ===== Ledger Handlers =====

/// The caller's own ledger entries
pub async fn get_my_ledger(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<LedgerEntry>>>, AppError> {
    let entries = state.ledger_service.list_for_user(user.id).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

/// Admin ledger search
pub async fn search_ledger(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchLedgerQuery>,
) -> Result<Json<ApiResponse<Vec<LedgerEntry>>>, AppError> {
    user.require(SHOW_TRANSACTIONS)?;
    let entries = state.ledger_service.search(query).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

/// A user's ledger entries, for admins
pub async fn get_user_ledger(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<LedgerEntry>>>, AppError> {
    user.require(SHOW_TRANSACTIONS)?;
    let entries = state.ledger_service.list_for_user(user_id).await?;
    Ok(Json(ApiResponse::ok(entries)))
}
