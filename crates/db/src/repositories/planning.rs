use chrono::{DateTime, Utc};
use sqlx::Row;

use furlough_core::domain::planning::{
    HolidayPlan, PlanDate, PlanId, PlanStatus, PlanningWindow, WindowId, WindowStage,
};
use furlough_core::domain::user::UserId;

use super::{parse_date, parse_enum, parse_utc, PlanningRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPlanningRepository {
    pool: DbPool,
}

impl SqlPlanningRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_window(row: &sqlx::sqlite::SqliteRow) -> Result<PlanningWindow, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i64 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let opens_on: String =
        row.try_get("opens_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let closes_on: String =
        row.try_get("closes_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let stage: String = row.try_get("stage").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(PlanningWindow {
        id: WindowId(id),
        year: year as i32,
        opens_on: parse_date(&opens_on)?,
        closes_on: parse_date(&closes_on)?,
        stage: parse_enum(&stage)?,
        is_active: is_active != 0,
    })
}

fn row_to_plan_header(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<HolidayPlan, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let window_id: String =
        row.try_get("window_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i64 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let version: i64 =
        row.try_get("version").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at: Option<String> =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(HolidayPlan {
        id: PlanId(id),
        user_id: UserId(user_id),
        window_id: WindowId(window_id),
        year: year as i32,
        status: parse_enum(&status)?,
        version: version.max(0) as u32,
        submitted_at: submitted_at.as_deref().map(parse_utc).transpose()?,
        dates: Vec::new(),
    })
}

fn row_to_plan_date(row: &sqlx::sqlite::SqliteRow) -> Result<PlanDate, RepositoryError> {
    let date: String = row.try_get("date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let priority: String =
        row.try_get("priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reason: Option<String> =
        row.try_get("reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(PlanDate { date: parse_date(&date)?, priority: parse_enum(&priority)?, reason })
}

impl SqlPlanningRepository {
    async fn load_dates(&self, plan_id: &PlanId) -> Result<Vec<PlanDate>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT date, priority, reason FROM holiday_plan_dates
             WHERE plan_id = ? ORDER BY date ASC",
        )
        .bind(&plan_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_plan_date).collect()
    }
}

#[async_trait::async_trait]
impl PlanningRepository for SqlPlanningRepository {
    async fn find_window_by_year(
        &self,
        year: i32,
    ) -> Result<Option<PlanningWindow>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, year, opens_on, closes_on, stage, is_active
             FROM planning_windows WHERE year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_window(r)?)),
            None => Ok(None),
        }
    }

    async fn insert_window(&self, window: &PlanningWindow) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO planning_windows (id, year, opens_on, closes_on, stage, is_active)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&window.id.0)
        .bind(window.year)
        .bind(window.opens_on.to_string())
        .bind(window.closes_on.to_string())
        .bind(window.stage.to_string())
        .bind(i64::from(window.is_active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_window_stage(
        &self,
        id: &WindowId,
        stage: WindowStage,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE planning_windows SET stage = ? WHERE id = ?")
            .bind(stage.to_string())
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_plan(
        &self,
        user_id: &UserId,
        year: i32,
    ) -> Result<Option<HolidayPlan>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, window_id, year, status, version, submitted_at
             FROM holiday_plans WHERE user_id = ? AND year = ?",
        )
        .bind(&user_id.0)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => {
                let mut plan = row_to_plan_header(r)?;
                plan.dates = self.load_dates(&plan.id).await?;
                Ok(Some(plan))
            }
            None => Ok(None),
        }
    }

    async fn insert_plan(&self, plan: &HolidayPlan) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO holiday_plans (id, user_id, window_id, year, status, version,
                                        submitted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&plan.id.0)
        .bind(&plan.user_id.0)
        .bind(&plan.window_id.0)
        .bind(plan.year)
        .bind(plan.status.to_string())
        .bind(i64::from(plan.version))
        .bind(plan.submitted_at.map(|dt| dt.to_rfc3339()))
        .execute(&mut *tx)
        .await?;

        for date in &plan.dates {
            sqlx::query(
                "INSERT INTO holiday_plan_dates (plan_id, date, priority, reason)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&plan.id.0)
            .bind(date.date.to_string())
            .bind(date.priority.to_string())
            .bind(&date.reason)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn replace_dates(
        &self,
        plan_id: &PlanId,
        dates: &[PlanDate],
    ) -> Result<u32, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM holiday_plan_dates WHERE plan_id = ?")
            .bind(&plan_id.0)
            .execute(&mut *tx)
            .await?;

        for date in dates {
            sqlx::query(
                "INSERT INTO holiday_plan_dates (plan_id, date, priority, reason)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&plan_id.0)
            .bind(date.date.to_string())
            .bind(date.priority.to_string())
            .bind(&date.reason)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE holiday_plans SET version = version + 1 WHERE id = ?")
            .bind(&plan_id.0)
            .execute(&mut *tx)
            .await?;

        let version: i64 =
            sqlx::query_scalar("SELECT version FROM holiday_plans WHERE id = ?")
                .bind(&plan_id.0)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(version.max(0) as u32)
    }

    async fn set_plan_status(
        &self,
        plan_id: &PlanId,
        status: PlanStatus,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE holiday_plans
             SET status = ?, submitted_at = COALESCE(?, submitted_at)
             WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(submitted_at.map(|dt| dt.to_rfc3339()))
        .bind(&plan_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn plans_for_users(
        &self,
        user_ids: &[UserId],
        year: i32,
    ) -> Result<Vec<HolidayPlan>, RepositoryError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; user_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, user_id, window_id, year, status, version, submitted_at
             FROM holiday_plans
             WHERE year = ? AND user_id IN ({placeholders})
             ORDER BY user_id ASC"
        );

        let mut query = sqlx::query(&sql).bind(year);
        for user_id in user_ids {
            query = query.bind(&user_id.0);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut plans = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut plan = row_to_plan_header(row)?;
            plan.dates = self.load_dates(&plan.id).await?;
            plans.push(plan);
        }
        Ok(plans)
    }
}
