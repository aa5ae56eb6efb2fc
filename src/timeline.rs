//! Append-only audit trail for purchases and custom requests

use anyhow::Result;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::OrderRef;

/// Append one timeline row for the linked transaction. Rows are never
/// updated or deleted.
pub async fn record(
    conn: &mut PgConnection,
    order: OrderRef,
    actor_id: Uuid,
    actor_role: &str,
    action: &str,
) -> Result<()> {
    let (purchase_id, request_id) = match order {
        OrderRef::ServicePurchase(id) => (Some(id), None),
        OrderRef::CustomRequest(id) => (None, Some(id)),
    };

    sqlx::query(
        r#"
        INSERT INTO timeline_entries (
            id, service_purchase_id, custom_request_id, actor_id, actor_role, action
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(purchase_id)
    .bind(request_id)
    .bind(actor_id)
    .bind(actor_role)
    .bind(action)
    .execute(conn)
    .await?;

    Ok(())
}
