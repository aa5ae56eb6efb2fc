//! Dispute settlement engine
//!
//! The planner turns an admin action into a `SettlementPlan`: target
//! statuses, ledger entries, and signed balance deltas. It is pure so the
//! money movement of every branch can be checked without a database. The
//! service applies a plan inside a single Postgres transaction, locking
//! the dispute and order rows so two concurrent resolutions serialize and
//! the loser fails the status precondition.

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::ledger::{self, NewLedgerEntry};
use crate::models::{
    AdminAction, Dispute, DisputeStatus, LedgerDirection, LedgerReason, OrderRef, OrderStatus,
    ResolveDisputeResponse,
};
use crate::timeline;

/// Configured fractions of the price, both in 0..=1.
#[derive(Debug, Clone, Copy)]
pub struct SettlementRates {
    pub commission: Decimal,
    pub penalty: Decimal,
}

/// Snapshot of the disputed transaction, loaded and row-locked inside the
/// settlement transaction. The payer is the purchase buyer or the request
/// owner; their frozen balance holds `price`.
#[derive(Debug, Clone, Copy)]
pub struct DisputedOrder {
    pub order: OrderRef,
    pub payer_id: Uuid,
    pub provider_id: Uuid,
    pub price: Decimal,
}

/// One planned ledger row
#[derive(Debug, PartialEq, Eq)]
pub struct PlannedEntry {
    pub user_id: Option<Uuid>,
    pub amount: Decimal,
    pub direction: LedgerDirection,
    pub description: &'static str,
}

/// Full effect of one admin action
#[derive(Debug)]
pub struct SettlementPlan {
    pub dispute_status: DisputeStatus,
    pub order_status: OrderStatus,
    pub timeline_action: &'static str,
    pub entries: Vec<PlannedEntry>,
    pub payer_balance_delta: Decimal,
    pub payer_frozen_delta: Decimal,
    pub provider_balance_delta: Decimal,
    pub platform_delta: Decimal,
    pub message: &'static str,
}

impl SettlementPlan {
    /// Signed sum over every account the plan touches. Zero for all
    /// branches: money moves, it is never created or destroyed.
    pub fn net_movement(&self) -> Decimal {
        self.payer_balance_delta
            + self.payer_frozen_delta
            + self.provider_balance_delta
            + self.platform_delta
    }
}

fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute the settlement for `action` over a disputed order.
///
/// Amount rules: the platform cut of `pay_provider` is `price` minus the
/// rounded provider amount so the pair sums exactly to `price`. For
/// `split`, each half rounds toward zero and the leftover minor unit goes
/// to the platform.
pub fn plan_settlement(
    order: &DisputedOrder,
    action: AdminAction,
    rates: &SettlementRates,
) -> SettlementPlan {
    let price = order.price;

    match action {
        AdminAction::RefundBuyer => SettlementPlan {
            dispute_status: DisputeStatus::Resolved,
            order_status: OrderStatus::Completed,
            timeline_action: "AdminRefundBuyer",
            entries: vec![PlannedEntry {
                user_id: Some(order.payer_id),
                amount: price,
                direction: LedgerDirection::Credit,
                description: "Dispute resolution: Refunded to buyer",
            }],
            payer_balance_delta: price,
            payer_frozen_delta: -price,
            provider_balance_delta: Decimal::ZERO,
            platform_delta: Decimal::ZERO,
            message: "Refunded buyer and dispute resolved",
        },

        AdminAction::PayProvider => {
            let provider_amount = round_money(price * (Decimal::ONE - rates.commission));
            let platform_amount = price - provider_amount;

            SettlementPlan {
                dispute_status: DisputeStatus::Resolved,
                order_status: OrderStatus::Completed,
                timeline_action: "AdminPayProvider",
                entries: vec![
                    PlannedEntry {
                        user_id: Some(order.payer_id),
                        amount: price,
                        direction: LedgerDirection::Debit,
                        description: "Dispute resolution: Paid to provider",
                    },
                    PlannedEntry {
                        user_id: Some(order.provider_id),
                        amount: provider_amount,
                        direction: LedgerDirection::Credit,
                        description: "Dispute resolution: Paid to provider",
                    },
                    PlannedEntry {
                        user_id: None,
                        amount: platform_amount,
                        direction: LedgerDirection::Credit,
                        description: "Dispute resolution: Platform commission",
                    },
                ],
                payer_balance_delta: Decimal::ZERO,
                payer_frozen_delta: -price,
                provider_balance_delta: provider_amount,
                platform_delta: platform_amount,
                message: "Paid provider and dispute resolved",
            }
        }

        AdminAction::Split => {
            let commission = round_money(price * rates.commission);
            let pool = price - commission;
            let half = (pool / Decimal::TWO).round_dp_with_strategy(2, RoundingStrategy::ToZero);
            // Leftover minor unit from halving goes to the platform.
            let platform_amount = commission + (pool - half - half);

            SettlementPlan {
                dispute_status: DisputeStatus::Resolved,
                order_status: OrderStatus::Completed,
                timeline_action: "AdminSplitPayment",
                entries: vec![
                    PlannedEntry {
                        user_id: Some(order.payer_id),
                        amount: half,
                        direction: LedgerDirection::Debit,
                        description: "Dispute resolution: Half refund to buyer",
                    },
                    PlannedEntry {
                        user_id: Some(order.provider_id),
                        amount: half,
                        direction: LedgerDirection::Credit,
                        description: "Dispute resolution: Half payment to provider",
                    },
                    PlannedEntry {
                        user_id: None,
                        amount: platform_amount,
                        direction: LedgerDirection::Credit,
                        description: "Dispute resolution: Platform commission on split",
                    },
                ],
                payer_balance_delta: half,
                payer_frozen_delta: -price,
                provider_balance_delta: half,
                platform_delta: platform_amount,
                message: "Split payment/refund executed and dispute resolved",
            }
        }

        AdminAction::ChargeBoth => {
            let penalty = round_money(price * rates.penalty);

            SettlementPlan {
                dispute_status: DisputeStatus::Resolved,
                order_status: OrderStatus::Completed,
                timeline_action: "AdminChargeBoth",
                entries: vec![
                    PlannedEntry {
                        user_id: Some(order.payer_id),
                        amount: penalty,
                        direction: LedgerDirection::Debit,
                        description: "Dispute resolution: Buyer paid penalty",
                    },
                    PlannedEntry {
                        user_id: Some(order.provider_id),
                        amount: penalty,
                        direction: LedgerDirection::Debit,
                        description: "Dispute resolution: Provider paid penalty",
                    },
                    PlannedEntry {
                        user_id: None,
                        amount: penalty + penalty,
                        direction: LedgerDirection::Credit,
                        description: "Dispute resolution: Penalties to platform",
                    },
                ],
                payer_balance_delta: price - penalty,
                payer_frozen_delta: -price,
                provider_balance_delta: -penalty,
                platform_delta: penalty + penalty,
                message: "Penalties applied to both and dispute resolved",
            }
        }

        AdminAction::AskProviderToRedo => SettlementPlan {
            dispute_status: DisputeStatus::UnderReview,
            order_status: OrderStatus::InProgress,
            timeline_action: "AdminAskRedo",
            entries: Vec::new(),
            payer_balance_delta: Decimal::ZERO,
            payer_frozen_delta: Decimal::ZERO,
            provider_balance_delta: Decimal::ZERO,
            platform_delta: Decimal::ZERO,
            message: "Asked provider to redo work, dispute marked under review",
        },
    }
}

/// Settlement orchestrator
pub struct SettlementService {
    db_pool: PgPool,
    rates: SettlementRates,
    platform_account_id: Uuid,
}

impl SettlementService {
    pub fn new(db_pool: PgPool, rates: SettlementRates, platform_account_id: Uuid) -> Self {
        Self {
            db_pool,
            rates,
            platform_account_id,
        }
    }

    /// Apply `action` to an open or under-review dispute. All writes happen
    /// in one transaction; any failure leaves the dispute untouched.
    pub async fn resolve(
        &self,
        dispute_id: Uuid,
        solution: &str,
        action: AdminAction,
        admin_id: Uuid,
    ) -> Result<ResolveDisputeResponse, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(anyhow::Error::from)?;

        let dispute =
            sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = $1 FOR UPDATE")
                .bind(dispute_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Dispute not found".to_string()))?;

        if dispute.status.is_terminal() {
            return Err(AppError::BadRequest(
                "Dispute already resolved or rejected".to_string(),
            ));
        }

        let order_ref = dispute.order_ref().ok_or_else(|| {
            AppError::BadRequest("Dispute is not linked to a purchase or request".to_string())
        })?;

        let order = load_order(&mut tx, order_ref).await?;
        let plan = plan_settlement(&order, action, &self.rates);

        sqlx::query(
            r#"
            UPDATE disputes
            SET status = $1, solution = $2, resolved_by_admin_id = $3, admin_decision_at = $4
            WHERE id = $5
            "#,
        )
        .bind(plan.dispute_status)
        .bind(solution)
        .bind(admin_id)
        .bind(Utc::now())
        .bind(dispute_id)
        .execute(&mut *tx)
        .await?;

        update_order_status(&mut tx, order_ref, plan.order_status).await?;

        for entry in &plan.entries {
            ledger::insert_entry(
                &mut *tx,
                NewLedgerEntry {
                    user_id: entry.user_id,
                    admin_id,
                    amount: entry.amount,
                    direction: entry.direction,
                    reason: LedgerReason::DisputeResolution,
                    order: order_ref,
                    dispute_id: Some(dispute_id),
                    description: entry.description,
                },
            )
            .await
            .map_err(AppError::Internal)?;
        }

        if !plan.payer_balance_delta.is_zero() || !plan.payer_frozen_delta.is_zero() {
            ledger::adjust_user_balance(
                &mut *tx,
                order.payer_id,
                plan.payer_balance_delta,
                plan.payer_frozen_delta,
            )
            .await
            .map_err(AppError::Internal)?;
        }

        if !plan.provider_balance_delta.is_zero() {
            ledger::adjust_user_balance(
                &mut *tx,
                order.provider_id,
                plan.provider_balance_delta,
                Decimal::ZERO,
            )
            .await
            .map_err(AppError::Internal)?;
        }

        if !plan.platform_delta.is_zero() {
            ledger::credit_platform(&mut *tx, self.platform_account_id, plan.platform_delta)
                .await
                .map_err(AppError::Internal)?;
        }

        timeline::record(&mut *tx, order_ref, admin_id, "admin", plan.timeline_action)
            .await
            .map_err(AppError::Internal)?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        tracing::info!(
            dispute_id = %dispute_id,
            action = plan.timeline_action,
            admin_id = %admin_id,
            "dispute settled"
        );

        Ok(ResolveDisputeResponse {
            dispute_id,
            status: plan.dispute_status,
            message: plan.message.to_string(),
        })
    }
}

/// Load the disputed order and lock its row for the rest of the
/// transaction. Custom requests must carry an accepted offer with a
/// provider before any payout branch can run.
async fn load_order(
    tx: &mut Transaction<'_, Postgres>,
    order_ref: OrderRef,
) -> Result<DisputedOrder, AppError> {
    match order_ref {
        OrderRef::ServicePurchase(id) => {
            let row = sqlx::query_as::<_, (Uuid, Uuid, Decimal)>(
                r#"
                SELECT p.buyer_id, s.provider_id, s.price
                FROM service_purchases p
                JOIN services s ON s.id = p.service_id
                WHERE p.id = $1
                FOR UPDATE OF p
                "#,
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Service purchase linked to dispute not found".to_string())
            })?;

            Ok(DisputedOrder {
                order: order_ref,
                payer_id: row.0,
                provider_id: row.1,
                price: row.2,
            })
        }
        OrderRef::CustomRequest(id) => {
            let row = sqlx::query_as::<_, (Uuid, Option<Uuid>, Option<Decimal>)>(
                r#"
                SELECT r.requester_id, o.provider_id, o.price
                FROM custom_requests r
                LEFT JOIN request_offers o ON o.id = r.accepted_offer_id
                WHERE r.id = $1
                FOR UPDATE OF r
                "#,
            )
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Custom request linked to dispute not found".to_string())
            })?;

            let (provider_id, price) = match (row.1, row.2) {
                (Some(provider_id), Some(price)) => (provider_id, price),
                _ => {
                    return Err(AppError::BadRequest(
                        "No accepted offer/provider linked to this request".to_string(),
                    ))
                }
            };

            Ok(DisputedOrder {
                order: order_ref,
                payer_id: row.0,
                provider_id,
                price,
            })
        }
    }
}

async fn update_order_status(
    tx: &mut Transaction<'_, Postgres>,
    order_ref: OrderRef,
    status: OrderStatus,
) -> Result<(), AppError> {
    let (sql, id) = match order_ref {
        OrderRef::ServicePurchase(id) => (
            "UPDATE service_purchases SET status = $1, updated_at = now() WHERE id = $2",
            id,
        ),
        OrderRef::CustomRequest(id) => (
            "UPDATE custom_requests SET status = $1, updated_at = now() WHERE id = $2",
            id,
        ),
    };

    sqlx::query(sql)
        .bind(status)
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rates() -> SettlementRates {
        SettlementRates {
            commission: dec("0.1"),
            penalty: dec("0.05"),
        }
    }

    fn order(price: &str) -> DisputedOrder {
        DisputedOrder {
            order: OrderRef::ServicePurchase(Uuid::new_v4()),
            payer_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            price: dec(price),
        }
    }

    fn total(entries: &[PlannedEntry], direction: LedgerDirection) -> Decimal {
        entries
            .iter()
            .filter(|e| e.direction == direction)
            .map(|e| e.amount)
            .sum()
    }

    #[test]
    fn refund_buyer_returns_full_price() {
        let order = order("100");
        let plan = plan_settlement(&order, AdminAction::RefundBuyer, &rates());

        assert_eq!(plan.dispute_status, DisputeStatus::Resolved);
        assert_eq!(plan.order_status, OrderStatus::Completed);
        assert_eq!(plan.timeline_action, "AdminRefundBuyer");
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].user_id, Some(order.payer_id));
        assert_eq!(plan.entries[0].amount, dec("100"));
        assert_eq!(plan.entries[0].direction, LedgerDirection::Credit);
        assert_eq!(plan.payer_balance_delta, dec("100"));
        assert_eq!(plan.payer_frozen_delta, dec("-100"));
        assert_eq!(plan.net_movement(), Decimal::ZERO);
    }

    #[test]
    fn pay_provider_takes_commission() {
        // price=100, commission=0.1: provider 90, platform 10
        let order = order("100");
        let plan = plan_settlement(&order, AdminAction::PayProvider, &rates());

        assert_eq!(plan.timeline_action, "AdminPayProvider");
        assert_eq!(plan.provider_balance_delta, dec("90"));
        assert_eq!(plan.platform_delta, dec("10"));
        assert_eq!(plan.payer_frozen_delta, dec("-100"));
        assert_eq!(plan.payer_balance_delta, Decimal::ZERO);

        assert_eq!(plan.entries.len(), 3);
        assert_eq!(total(&plan.entries, LedgerDirection::Debit), dec("100"));
        assert_eq!(total(&plan.entries, LedgerDirection::Credit), dec("100"));
        assert!(plan.entries.iter().any(|e| e.user_id.is_none()));
        assert_eq!(plan.net_movement(), Decimal::ZERO);
    }

    #[test]
    fn split_halves_after_commission() {
        // price=100, commission=0.1: platform 10, each half 45
        let order = order("100");
        let plan = plan_settlement(&order, AdminAction::Split, &rates());

        assert_eq!(plan.timeline_action, "AdminSplitPayment");
        assert_eq!(plan.payer_balance_delta, dec("45"));
        assert_eq!(plan.provider_balance_delta, dec("45"));
        assert_eq!(plan.platform_delta, dec("10"));
        assert_eq!(plan.payer_frozen_delta, dec("-100"));
        assert_eq!(plan.net_movement(), Decimal::ZERO);
    }

    #[test]
    fn split_remainder_goes_to_platform() {
        // price=100.01, commission=0.1: commission rounds to 10.00,
        // pool 90.01 halves to 45.00 each, leftover 0.01 to platform.
        let order = order("100.01");
        let plan = plan_settlement(&order, AdminAction::Split, &rates());

        assert_eq!(plan.payer_balance_delta, dec("45.00"));
        assert_eq!(plan.provider_balance_delta, dec("45.00"));
        assert_eq!(plan.platform_delta, dec("10.01"));
        assert_eq!(plan.net_movement(), Decimal::ZERO);
    }

    #[test]
    fn charge_both_penalizes_both_parties() {
        // price=200, penalty=0.05: penalty 10, buyer keeps 190,
        // provider loses 10, platform gains 20
        let order = order("200");
        let plan = plan_settlement(&order, AdminAction::ChargeBoth, &rates());

        assert_eq!(plan.timeline_action, "AdminChargeBoth");
        assert_eq!(plan.payer_balance_delta, dec("190"));
        assert_eq!(plan.payer_frozen_delta, dec("-200"));
        assert_eq!(plan.provider_balance_delta, dec("-10"));
        assert_eq!(plan.platform_delta, dec("20"));

        // total moved is 2x penalty
        assert_eq!(total(&plan.entries, LedgerDirection::Debit), dec("20"));
        assert_eq!(total(&plan.entries, LedgerDirection::Credit), dec("20"));
        assert_eq!(plan.net_movement(), Decimal::ZERO);
    }

    #[test]
    fn ask_redo_reopens_without_money_movement() {
        let order = order("100");
        let plan = plan_settlement(&order, AdminAction::AskProviderToRedo, &rates());

        assert_eq!(plan.dispute_status, DisputeStatus::UnderReview);
        assert_eq!(plan.order_status, OrderStatus::InProgress);
        assert_eq!(plan.timeline_action, "AdminAskRedo");
        assert!(plan.entries.is_empty());
        assert_eq!(plan.payer_frozen_delta, Decimal::ZERO);
        assert_eq!(plan.net_movement(), Decimal::ZERO);
    }

    #[test]
    fn ask_redo_is_the_only_non_terminal_action() {
        let order = order("100");
        for action in [
            AdminAction::RefundBuyer,
            AdminAction::PayProvider,
            AdminAction::Split,
            AdminAction::ChargeBoth,
        ] {
            let plan = plan_settlement(&order, action, &rates());
            assert_eq!(plan.dispute_status, DisputeStatus::Resolved);
            assert_eq!(plan.order_status, OrderStatus::Completed);
            // every settling branch releases the full frozen hold once
            assert_eq!(plan.payer_frozen_delta, -order.price);
        }
    }

    #[test]
    fn every_branch_conserves_money() {
        for price in ["0.01", "1", "33.33", "99.99", "100.01", "12345.67"] {
            let order = order(price);
            for action in [
                AdminAction::RefundBuyer,
                AdminAction::PayProvider,
                AdminAction::Split,
                AdminAction::ChargeBoth,
                AdminAction::AskProviderToRedo,
            ] {
                let plan = plan_settlement(&order, action, &rates());
                assert_eq!(
                    plan.net_movement(),
                    Decimal::ZERO,
                    "price {price} action {action:?}"
                );
                // ledger amounts are always non-negative
                assert!(plan.entries.iter().all(|e| e.amount >= Decimal::ZERO));
            }
        }
    }

    #[test]
    fn zero_commission_pays_provider_in_full() {
        let order = order("100");
        let rates = SettlementRates {
            commission: Decimal::ZERO,
            penalty: dec("0.05"),
        };
        let plan = plan_settlement(&order, AdminAction::PayProvider, &rates);
        assert_eq!(plan.provider_balance_delta, dec("100"));
        assert_eq!(plan.platform_delta, Decimal::ZERO);
    }
}
