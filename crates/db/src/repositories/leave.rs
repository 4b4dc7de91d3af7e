use chrono::NaiveDate;
use sqlx::Row;

use furlough_core::domain::leave::{
    LeaveRequest, LeaveRequestId, LeaveStatus, LeaveType, LeaveTypeId,
};
use furlough_core::domain::user::UserId;

use super::{parse_date, parse_enum, parse_utc, LeaveRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLeaveRepository {
    pool: DbPool,
}

impl SqlLeaveRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<LeaveRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let leave_type_id: String =
        row.try_get("leave_type_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let start_date: String =
        row.try_get("start_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let end_date: String =
        row.try_get("end_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let working_days: i64 =
        row.try_get("working_days").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reason: Option<String> =
        row.try_get("reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(LeaveRequest {
        id: LeaveRequestId(id),
        user_id: UserId(user_id),
        leave_type_id: LeaveTypeId(leave_type_id),
        start_date: parse_date(&start_date)?,
        end_date: parse_date(&end_date)?,
        working_days,
        status: parse_enum(&status)?,
        reason,
        created_at: parse_utc(&created_at)?,
    })
}

fn row_to_type(row: &sqlx::sqlite::SqliteRow) -> Result<LeaveType, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let code: String = row.try_get("code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let days_allowed: i64 =
        row.try_get("days_allowed").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let carry_forward: i64 =
        row.try_get("carry_forward").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let carry_forward_pct: i64 =
        row.try_get("carry_forward_pct").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let max_carry_forward: i64 =
        row.try_get("max_carry_forward").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(LeaveType {
        id: LeaveTypeId(id),
        code,
        name,
        days_allowed,
        carry_forward: carry_forward != 0,
        carry_forward_pct: carry_forward_pct.max(0) as u32,
        max_carry_forward,
    })
}

#[async_trait::async_trait]
impl LeaveRepository for SqlLeaveRepository {
    async fn create_request(&self, request: &LeaveRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO leave_requests (id, user_id, leave_type_id, start_date, end_date,
                                         working_days, status, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.user_id.0)
        .bind(&request.leave_type_id.0)
        .bind(request.start_date.to_string())
        .bind(request.end_date.to_string())
        .bind(request.working_days)
        .bind(request.status.to_string())
        .bind(&request.reason)
        .bind(request.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_request(
        &self,
        id: &LeaveRequestId,
    ) -> Result<Option<LeaveRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, leave_type_id, start_date, end_date, working_days,
                    status, reason, created_at
             FROM leave_requests WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn set_request_status(
        &self,
        id: &LeaveRequestId,
        status: LeaveStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE leave_requests SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_approved_leave_covering(
        &self,
        user_id: &UserId,
        date: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM leave_requests
             WHERE user_id = ? AND status = 'APPROVED'
               AND start_date <= ? AND end_date >= ?",
        )
        .bind(&user_id.0)
        .bind(date.to_string())
        .bind(date.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn find_type(&self, id: &LeaveTypeId) -> Result<Option<LeaveType>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, code, name, days_allowed, carry_forward, carry_forward_pct,
                    max_carry_forward
             FROM leave_types WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_type(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_type(&self, leave_type: &LeaveType) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO leave_types (id, code, name, days_allowed, carry_forward,
                                      carry_forward_pct, max_carry_forward)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 code = excluded.code,
                 name = excluded.name,
                 days_allowed = excluded.days_allowed,
                 carry_forward = excluded.carry_forward,
                 carry_forward_pct = excluded.carry_forward_pct,
                 max_carry_forward = excluded.max_carry_forward",
        )
        .bind(&leave_type.id.0)
        .bind(&leave_type.code)
        .bind(&leave_type.name)
        .bind(leave_type.days_allowed)
        .bind(i64::from(leave_type.carry_forward))
        .bind(i64::from(leave_type.carry_forward_pct))
        .bind(leave_type.max_carry_forward)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
