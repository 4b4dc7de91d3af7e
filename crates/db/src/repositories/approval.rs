use chrono::{DateTime, Utc};
use sqlx::Row;

use furlough_core::domain::approval::{Approval, ApprovalId, ApprovalStatus};
use furlough_core::domain::leave::LeaveRequestId;
use furlough_core::domain::user::UserId;

use super::{parse_enum, parse_utc, ApprovalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlApprovalRepository {
    pool: DbPool,
}

impl SqlApprovalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const APPROVAL_COLUMNS: &str = "id, leave_request_id, approver_id, level, status, \
     escalated_to_id, escalated_at, escalation_reason, comments, created_at, decided_at";

fn row_to_approval(row: &sqlx::sqlite::SqliteRow) -> Result<Approval, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let leave_request_id: String =
        row.try_get("leave_request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level: i64 = row.try_get("level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let escalated_to_id: Option<String> =
        row.try_get("escalated_to_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let escalated_at: Option<String> =
        row.try_get("escalated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let escalation_reason: Option<String> =
        row.try_get("escalation_reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decided_at: Option<String> =
        row.try_get("decided_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Approval {
        id: ApprovalId(id),
        leave_request_id: LeaveRequestId(leave_request_id),
        approver_id: UserId(approver_id),
        level: level.max(1) as u32,
        status: parse_enum(&status)?,
        escalated_to_id: escalated_to_id.map(UserId),
        escalated_at: escalated_at.as_deref().map(parse_utc).transpose()?,
        escalation_reason,
        comments,
        created_at: parse_utc(&created_at)?,
        decided_at: decided_at.as_deref().map(parse_utc).transpose()?,
    })
}

async fn open_exists<'e, E>(
    executor: E,
    request_id: &LeaveRequestId,
    approver_id: &UserId,
) -> Result<bool, RepositoryError>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM approvals
         WHERE leave_request_id = ? AND approver_id = ? AND status = 'PENDING'
           AND escalated_to_id IS NULL",
    )
    .bind(&request_id.0)
    .bind(&approver_id.0)
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}

fn insert_query(approval: &Approval) -> sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(
        "INSERT INTO approvals (id, leave_request_id, approver_id, level, status,
                                escalated_to_id, escalated_at, escalation_reason,
                                comments, created_at, decided_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&approval.id.0)
    .bind(&approval.leave_request_id.0)
    .bind(&approval.approver_id.0)
    .bind(i64::from(approval.level))
    .bind(approval.status.to_string())
    .bind(approval.escalated_to_id.as_ref().map(|id| id.0.clone()))
    .bind(approval.escalated_at.map(|dt| dt.to_rfc3339()))
    .bind(approval.escalation_reason.clone())
    .bind(approval.comments.clone())
    .bind(approval.created_at.to_rfc3339())
    .bind(approval.decided_at.map(|dt| dt.to_rfc3339()))
}

#[async_trait::async_trait]
impl ApprovalRepository for SqlApprovalRepository {
    async fn find_by_id(&self, id: &ApprovalId) -> Result<Option<Approval>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {APPROVAL_COLUMNS} FROM approvals WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_approval(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_pending(&self, approval: &Approval) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if open_exists(&mut *tx, &approval.leave_request_id, &approval.approver_id).await? {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_query(approval).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn open_for_request(
        &self,
        request_id: &LeaveRequestId,
    ) -> Result<Option<Approval>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approvals
             WHERE leave_request_id = ? AND status = 'PENDING' AND escalated_to_id IS NULL
             ORDER BY level DESC
             LIMIT 1"
        ))
        .bind(&request_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_approval(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_request(
        &self,
        request_id: &LeaveRequestId,
    ) -> Result<Vec<Approval>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approvals
             WHERE leave_request_id = ?
             ORDER BY level ASC, created_at ASC"
        ))
        .bind(&request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_approval).collect()
    }

    async fn list_stale_pending(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Approval>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {APPROVAL_COLUMNS} FROM approvals
             WHERE status = 'PENDING' AND escalated_to_id IS NULL AND created_at <= ?
             ORDER BY created_at ASC"
        ))
        .bind(threshold.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_approval).collect()
    }

    async fn pending_assigned_since(
        &self,
        approver_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM approvals
             WHERE approver_id = ? AND status = 'PENDING' AND created_at >= ?",
        )
        .bind(&approver_id.0)
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn escalate(
        &self,
        old_id: &ApprovalId,
        reason: &str,
        escalated_at: DateTime<Utc>,
        replacement: &Approval,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE approvals
             SET escalated_to_id = ?, escalated_at = ?, escalation_reason = ?
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(&replacement.approver_id.0)
        .bind(escalated_at.to_rfc3339())
        .bind(reason)
        .bind(&old_id.0)
        .execute(&mut *tx)
        .await?;

        let created =
            if open_exists(&mut *tx, &replacement.leave_request_id, &replacement.approver_id)
                .await?
            {
                false
            } else {
                insert_query(replacement).execute(&mut *tx).await?;
                true
            };

        tx.commit().await?;
        Ok(created)
    }

    async fn decide(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
        comments: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approvals
             SET status = ?, comments = COALESCE(?, comments), decided_at = ?
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(status.to_string())
        .bind(comments)
        .bind(decided_at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn auto_approve(
        &self,
        id: &ApprovalId,
        request_id: &LeaveRequestId,
        comment: &str,
        decided_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE approvals
             SET status = 'APPROVED', comments = ?, decided_at = ?
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(comment)
        .bind(decided_at.to_rfc3339())
        .bind(&id.0)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE leave_requests SET status = 'APPROVED' WHERE id = ?")
            .bind(&request_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
