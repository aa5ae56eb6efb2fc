//! Dispute read queries

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Dispute, DisputeWithRole, PartyRole, SearchDisputesQuery};

pub struct DisputeService {
    db_pool: PgPool,
}

impl DisputeService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Disputes where the user is a party, newest first, each annotated
    /// with the side they are on.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DisputeWithRole>, AppError> {
        let disputes = sqlx::query_as::<_, Dispute>(
            r#"
            SELECT * FROM disputes
            WHERE complainant_id = $1 OR respondent_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(disputes
            .into_iter()
            .map(|dispute| {
                let user_role = if dispute.complainant_id == user_id {
                    PartyRole::Complainant
                } else {
                    PartyRole::Respondent
                };
                DisputeWithRole { dispute, user_role }
            })
            .collect())
    }

    /// A single dispute, visible only to its parties.
    pub async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Dispute, AppError> {
        let dispute = self.get(id).await?;

        if dispute.complainant_id != user_id && dispute.respondent_id != user_id {
            return Err(AppError::Forbidden(
                "You are not authorized to view this dispute".to_string(),
            ));
        }

        Ok(dispute)
    }

    /// A single dispute without party checks; callers gate on permission.
    pub async fn get(&self, id: Uuid) -> Result<Dispute, AppError> {
        sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Dispute not found".to_string()))
    }

    /// Admin search with filters and pagination, newest first.
    pub async fn search(&self, query: SearchDisputesQuery) -> Result<Vec<Dispute>, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM disputes WHERE 1=1");

        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        if let Some(complainant_id) = query.complainant_id {
            builder.push(" AND complainant_id = ");
            builder.push_bind(complainant_id);
        }
        if let Some(respondent_id) = query.respondent_id {
            builder.push(" AND respondent_id = ");
            builder.push_bind(respondent_id);
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

        let disputes = builder
            .build_query_as::<Dispute>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(disputes)
    }
}
