//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthKeys;
use crate::dispute_service::DisputeService;
use crate::ledger::LedgerService;
use crate::settlement::SettlementService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settlement_service: Arc<SettlementService>,
    pub dispute_service: Arc<DisputeService>,
    pub ledger_service: Arc<LedgerService>,
    pub auth_keys: AuthKeys,
}

impl AppState {
    pub fn new(
        settlement_service: Arc<SettlementService>,
        dispute_service: Arc<DisputeService>,
        ledger_service: Arc<LedgerService>,
        auth_keys: AuthKeys,
    ) -> Self {
        Self {
            settlement_service,
            dispute_service,
            ledger_service,
            auth_keys,
        }
    }
}

impl FromRef<AppState> for AuthKeys {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_keys.clone()
    }
}

impl FromRef<AppState> for Arc<SettlementService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.settlement_service.clone()
    }
}

impl FromRef<AppState> for Arc<DisputeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.dispute_service.clone()
    }
}

impl FromRef<AppState> for Arc<LedgerService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ledger_service.clone()
    }
}
