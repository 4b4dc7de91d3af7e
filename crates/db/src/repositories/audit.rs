use sqlx::Row;

use furlough_core::audit::AuditEvent;
use furlough_core::domain::user::UserId;

use super::{parse_utc, AuditRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_json_text(value: &Option<serde_json::Value>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

fn from_json_text(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
}

#[async_trait::async_trait]
impl AuditRepository for SqlAuditRepository {
    async fn append(&self, event: &AuditEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO audit_log (id, action, entity_type, entity_id, user_id,
                                    old_value, new_value, details, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(&event.action)
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(event.user_id.as_ref().map(|id| id.0.clone()))
        .bind(to_json_text(&event.old_value))
        .bind(to_json_text(&event.new_value))
        .bind(&event.details)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, action, entity_type, entity_id, user_id, old_value, new_value,
                    details, created_at
             FROM audit_log
             WHERE entity_type = ? AND entity_id = ?
             ORDER BY created_at ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String =
                    row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let action: String =
                    row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let entity_type: String = row
                    .try_get("entity_type")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let entity_id: String = row
                    .try_get("entity_id")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let user_id: Option<String> =
                    row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let old_value: Option<String> = row
                    .try_get("old_value")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let new_value: Option<String> = row
                    .try_get("new_value")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let details: Option<String> =
                    row.try_get("details").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let created_at: String = row
                    .try_get("created_at")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;

                Ok(AuditEvent {
                    event_id: id,
                    action,
                    entity_type,
                    entity_id,
                    user_id: user_id.map(UserId),
                    old_value: from_json_text(old_value),
                    new_value: from_json_text(new_value),
                    details,
                    occurred_at: parse_utc(&created_at)?,
                })
            })
            .collect()
    }
}
