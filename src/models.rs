//! Data models for the acadex backend

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user funds. `frozen_balance` holds the amount earmarked for an
/// in-flight purchase or request until settlement releases it.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserBalance {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub frozen_balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Platform revenue account. Commission and penalty amounts land here.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformAccount {
    pub id: Uuid,
    pub total_balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Dispute status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "dispute_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Rejected,
}

impl DisputeStatus {
    /// Terminal disputes accept no further admin action.
    pub fn is_terminal(self) -> bool {
        matches!(self, DisputeStatus::Resolved | DisputeStatus::Rejected)
    }
}

/// Status shared by service purchases and custom requests
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Delivered,
    Disputed,
    Completed,
    Cancelled,
}

/// The transaction a dispute is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderRef {
    ServicePurchase(Uuid),
    CustomRequest(Uuid),
}

/// Dispute model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Dispute {
    pub id: Uuid,
    pub service_purchase_id: Option<Uuid>,
    pub custom_request_id: Option<Uuid>,
    pub complainant_id: Uuid,
    pub respondent_id: Uuid,
    pub status: DisputeStatus,
    pub reason: String,
    pub solution: Option<String>,
    pub resolved_by_admin_id: Option<Uuid>,
    pub admin_decision_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Dispute {
    /// The linked transaction. `None` never occurs for persisted rows; the
    /// schema enforces exactly one link.
    pub fn order_ref(&self) -> Option<OrderRef> {
        match (self.service_purchase_id, self.custom_request_id) {
            (Some(id), None) => Some(OrderRef::ServicePurchase(id)),
            (None, Some(id)) => Some(OrderRef::CustomRequest(id)),
            _ => None,
        }
    }
}

/// Ledger entry direction
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ledger_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LedgerDirection {
    Credit,
    Debit,
}

/// Ledger entry reason
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ledger_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    Purchase,
    Payout,
    DisputeResolution,
}

/// Immutable ledger entry. A `None` user marks platform revenue.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub admin_id: Uuid,
    pub amount: Decimal,
    pub direction: LedgerDirection,
    pub reason: LedgerReason,
    pub service_purchase_id: Option<Uuid>,
    pub custom_request_id: Option<Uuid>,
    pub dispute_id: Option<Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit row for a purchase or request
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub service_purchase_id: Option<Uuid>,
    pub custom_request_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub actor_role: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

/// Admin action over a dispute. `refund_owner` is the custom-request
/// spelling of `refund_buyer`; both settle the same way.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    #[serde(alias = "refund_owner")]
    RefundBuyer,
    PayProvider,
    AskProviderToRedo,
    Split,
    ChargeBoth,
}

/// Resolve request payload
#[derive(Debug, Deserialize, Validate)]
pub struct ResolveDisputeRequest {
    pub dispute_id: Uuid,
    #[validate(length(min = 5))]
    pub solution: String,
    pub admin_action: AdminAction,
}

/// Resolve confirmation
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveDisputeResponse {
    pub dispute_id: Uuid,
    pub status: DisputeStatus,
    pub message: String,
}

/// Dispute annotated with the requesting user's side of it
#[derive(Debug, Serialize)]
pub struct DisputeWithRole {
    #[serde(flatten)]
    pub dispute: Dispute,
    pub user_role: PartyRole,
}

/// Which side of a dispute a user is on
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Complainant,
    Respondent,
}

/// Admin dispute search filters
#[derive(Debug, Default, Deserialize)]
pub struct SearchDisputesQuery {
    pub status: Option<DisputeStatus>,
    pub complainant_id: Option<Uuid>,
    pub respondent_id: Option<Uuid>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Ledger search filters
#[derive(Debug, Default, Deserialize)]
pub struct SearchLedgerQuery {
    pub user_id: Option<Uuid>,
    pub admin_id: Option<Uuid>,
    pub direction: Option<LedgerDirection>,
    pub reason: Option<LedgerReason>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_owner_aliases_refund_buyer() {
        let action: AdminAction = serde_json::from_str("\"refund_owner\"").unwrap();
        assert_eq!(action, AdminAction::RefundBuyer);
        let action: AdminAction = serde_json::from_str("\"refund_buyer\"").unwrap();
        assert_eq!(action, AdminAction::RefundBuyer);
    }

    #[test]
    fn admin_action_rejects_unknown_variant() {
        assert!(serde_json::from_str::<AdminAction>("\"escalate\"").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(DisputeStatus::Resolved.is_terminal());
        assert!(DisputeStatus::Rejected.is_terminal());
        assert!(!DisputeStatus::Open.is_terminal());
        assert!(!DisputeStatus::UnderReview.is_terminal());
    }

    #[test]
    fn solution_min_length_enforced() {
        let req = ResolveDisputeRequest {
            dispute_id: Uuid::new_v4(),
            solution: "ok".into(),
            admin_action: AdminAction::Split,
        };
        assert!(req.validate().is_err());

        let req = ResolveDisputeRequest {
            solution: "refund in full".into(),
            ..req
        };
        assert!(req.validate().is_ok());
    }
}
