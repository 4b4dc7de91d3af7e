use chrono::NaiveDate;
use sqlx::Row;

use super::{parse_date, HolidayRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHolidayRepository {
    pool: DbPool,
}

impl SqlHolidayRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HolidayRepository for SqlHolidayRepository {
    async fn active_dates(&self) -> Result<Vec<NaiveDate>, RepositoryError> {
        let rows = sqlx::query("SELECT date FROM holidays WHERE is_active = 1 ORDER BY date ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let raw: String =
                    row.try_get("date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                parse_date(&raw)
            })
            .collect()
    }

    async fn upsert(
        &self,
        date: NaiveDate,
        name: &str,
        is_active: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO holidays (date, name, is_active)
             VALUES (?, ?, ?)
             ON CONFLICT(date) DO UPDATE SET
                 name = excluded.name,
                 is_active = excluded.is_active",
        )
        .bind(date.to_string())
        .bind(name)
        .bind(i64::from(is_active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
