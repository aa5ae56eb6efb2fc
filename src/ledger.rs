//! Ledger primitives and read queries
//!
//! Writes operate on a borrowed connection so the settlement transaction
//! owns atomicity; an entry and its paired balance mutation are always
//! issued inside the same transaction by the caller.

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    LedgerDirection, LedgerEntry, LedgerReason, OrderRef, SearchLedgerQuery,
};

/// A ledger entry about to be written
#[derive(Debug)]
pub struct NewLedgerEntry<'a> {
    /// `None` records platform revenue.
    pub user_id: Option<Uuid>,
    pub admin_id: Uuid,
    pub amount: Decimal,
    pub direction: LedgerDirection,
    pub reason: LedgerReason,
    pub order: OrderRef,
    pub dispute_id: Option<Uuid>,
    pub description: &'a str,
}

/// Insert one immutable ledger row.
pub async fn insert_entry(conn: &mut PgConnection, entry: NewLedgerEntry<'_>) -> Result<()> {
    let (purchase_id, request_id) = match entry.order {
        OrderRef::ServicePurchase(id) => (Some(id), None),
        OrderRef::CustomRequest(id) => (None, Some(id)),
    };

    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, user_id, admin_id, amount, direction, reason,
            service_purchase_id, custom_request_id, dispute_id, description
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.admin_id)
    .bind(entry.amount)
    .bind(entry.direction)
    .bind(entry.reason)
    .bind(purchase_id)
    .bind(request_id)
    .bind(entry.dispute_id)
    .bind(entry.description)
    .execute(conn)
    .await?;

    Ok(())
}

/// Apply a signed delta to a user's withdrawable and frozen funds. The
/// schema's non-negativity checks abort the transaction on underflow.
pub async fn adjust_user_balance(
    conn: &mut PgConnection,
    user_id: Uuid,
    balance_delta: Decimal,
    frozen_delta: Decimal,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE user_balances
        SET balance = balance + $2,
            frozen_balance = frozen_balance + $3,
            updated_at = now()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(balance_delta)
    .bind(frozen_delta)
    .execute(conn)
    .await?;

    if result.rows_affected() != 1 {
        bail!("no balance row for user {user_id}");
    }
    Ok(())
}

/// Credit the platform revenue account.
pub async fn credit_platform(
    conn: &mut PgConnection,
    account_id: Uuid,
    amount: Decimal,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE platform_accounts
        SET total_balance = total_balance + $2, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(account_id)
    .bind(amount)
    .execute(conn)
    .await?;

    if result.rows_affected() != 1 {
        bail!("platform account {account_id} missing");
    }
    Ok(())
}

/// Ledger read queries
pub struct LedgerService {
    db_pool: PgPool,
}

impl LedgerService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// A user's entries, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<LedgerEntry>, AppError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM ledger_entries WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(entries)
    }

    /// Filtered search with pagination, newest first.
    pub async fn search(&self, query: SearchLedgerQuery) -> Result<Vec<LedgerEntry>, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM ledger_entries WHERE 1=1");

        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ");
            builder.push_bind(user_id);
        }
        if let Some(admin_id) = query.admin_id {
            builder.push(" AND admin_id = ");
            builder.push_bind(admin_id);
        }
        if let Some(direction) = query.direction {
            builder.push(" AND direction = ");
            builder.push_bind(direction);
        }
        if let Some(reason) = query.reason {
            builder.push(" AND reason = ");
            builder.push_bind(reason);
        }
        if let Some(from_date) = query.from_date {
            builder.push(" AND created_at >= ");
            builder.push_bind(from_date);
        }
        if let Some(to_date) = query.to_date {
            builder.push(" AND created_at <= ");
            builder.push_bind(to_date);
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let entries = builder
            .build_query_as::<LedgerEntry>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(entries)
    }
}
