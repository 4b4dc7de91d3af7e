use sqlx::Row;

use furlough_core::domain::balance::LeaveBalance;
use furlough_core::domain::leave::LeaveTypeId;
use furlough_core::domain::user::UserId;
use furlough_core::ledger::BalanceEvent;
use furlough_core::rollover::RolloverInput;

use super::{BalanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBalanceRepository {
    pool: DbPool,
}

impl SqlBalanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_balance(row: &sqlx::sqlite::SqliteRow) -> Result<LeaveBalance, RepositoryError> {
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let leave_type_id: String =
        row.try_get("leave_type_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i64 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let entitled: i64 =
        row.try_get("entitled").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let used: i64 = row.try_get("used").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let pending: i64 =
        row.try_get("pending").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let carried_forward: i64 =
        row.try_get("carried_forward").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let available: i64 =
        row.try_get("available").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(LeaveBalance {
        user_id: UserId(user_id),
        leave_type_id: LeaveTypeId(leave_type_id),
        year: year as i32,
        entitled,
        used,
        pending,
        carried_forward,
        available,
    })
}

#[async_trait::async_trait]
impl BalanceRepository for SqlBalanceRepository {
    async fn find(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        year: i32,
    ) -> Result<Option<LeaveBalance>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, leave_type_id, year, entitled, used, pending,
                    carried_forward, available
             FROM leave_balances
             WHERE user_id = ? AND leave_type_id = ? AND year = ?",
        )
        .bind(&user_id.0)
        .bind(&leave_type_id.0)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_balance(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, balance: &LeaveBalance) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO leave_balances (user_id, leave_type_id, year, entitled, used,
                                         pending, carried_forward, available)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, leave_type_id, year) DO UPDATE SET
                 entitled = excluded.entitled,
                 used = excluded.used,
                 pending = excluded.pending,
                 carried_forward = excluded.carried_forward,
                 available = excluded.available",
        )
        .bind(&balance.user_id.0)
        .bind(&balance.leave_type_id.0)
        .bind(balance.year)
        .bind(balance.entitled)
        .bind(balance.used)
        .bind(balance.pending)
        .bind(balance.carried_forward)
        .bind(balance.available)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn apply_event(
        &self,
        user_id: &UserId,
        leave_type_id: &LeaveTypeId,
        year: i32,
        event: BalanceEvent,
    ) -> Result<bool, RepositoryError> {
        // Every SET clause reads the pre-update column values, so each
        // statement is one atomic read-modify-write and the recomputed
        // `available` always matches the ledger invariant.
        let (sql, days) = match event {
            BalanceEvent::DaysPending(days) => (
                "UPDATE leave_balances
                 SET pending = pending + ?1,
                     available = entitled + carried_forward - used - (pending + ?1)
                 WHERE user_id = ?2 AND leave_type_id = ?3 AND year = ?4",
                days,
            ),
            BalanceEvent::DaysApproved(days) => (
                "UPDATE leave_balances
                 SET used = used + ?1,
                     available = entitled + carried_forward - (used + ?1) - pending
                 WHERE user_id = ?2 AND leave_type_id = ?3 AND year = ?4",
                days,
            ),
            BalanceEvent::DaysRejected(days) => (
                "UPDATE leave_balances
                 SET pending = MAX(pending - ?1, 0),
                     available = entitled + carried_forward - used - MAX(pending - ?1, 0)
                 WHERE user_id = ?2 AND leave_type_id = ?3 AND year = ?4",
                days,
            ),
            BalanceEvent::DaysRestored(days) => (
                "UPDATE leave_balances
                 SET used = MAX(used - ?1, 0),
                     available = entitled + carried_forward - MAX(used - ?1, 0) - pending
                 WHERE user_id = ?2 AND leave_type_id = ?3 AND year = ?4",
                days,
            ),
        };

        let result = sqlx::query(sql)
            .bind(days)
            .bind(&user_id.0)
            .bind(&leave_type_id.0)
            .bind(year)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn rollover_inputs(
        &self,
        from_year: i32,
    ) -> Result<Vec<RolloverInput>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT b.user_id, b.leave_type_id, b.entitled, b.used, b.carried_forward,
                    lt.carry_forward_pct, lt.max_carry_forward, lt.days_allowed
             FROM leave_balances b
             JOIN leave_types lt ON lt.id = b.leave_type_id
             JOIN users u ON u.id = b.user_id
             WHERE b.year = ? AND lt.carry_forward = 1 AND u.is_active = 1
             ORDER BY b.user_id ASC, b.leave_type_id ASC",
        )
        .bind(from_year)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let user_id: String =
                    row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let leave_type_id: String = row
                    .try_get("leave_type_id")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let entitled: i64 =
                    row.try_get("entitled").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let used: i64 =
                    row.try_get("used").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let carried_forward: i64 = row
                    .try_get("carried_forward")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let carry_forward_pct: i64 = row
                    .try_get("carry_forward_pct")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let max_carry_forward: i64 = row
                    .try_get("max_carry_forward")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let days_allowed: i64 = row
                    .try_get("days_allowed")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;

                Ok(RolloverInput {
                    user_id: UserId(user_id),
                    leave_type_id: LeaveTypeId(leave_type_id),
                    entitled,
                    used,
                    carried_forward,
                    carry_forward_pct: carry_forward_pct.max(0) as u32,
                    max_carry_forward,
                    days_allowed,
                })
            })
            .collect()
    }

    async fn any_carried_forward(&self, year: i32) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM leave_balances WHERE year = ? AND carried_forward > 0",
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}
