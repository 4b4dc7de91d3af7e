use chrono::NaiveDate;
use sqlx::Row;

use furlough_core::domain::approval::DelegateGrant;
use furlough_core::domain::user::UserId;

use super::{parse_date, DelegateRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDelegateRepository {
    pool: DbPool,
}

impl SqlDelegateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_grant(row: &sqlx::sqlite::SqliteRow) -> Result<DelegateGrant, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delegator_id: String =
        row.try_get("delegator_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let delegate_id: String =
        row.try_get("delegate_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let starts_on: String =
        row.try_get("starts_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let ends_on: String =
        row.try_get("ends_on").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reason: Option<String> =
        row.try_get("reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(DelegateGrant {
        id,
        delegator_id: UserId(delegator_id),
        delegate_id: UserId(delegate_id),
        starts_on: parse_date(&starts_on)?,
        ends_on: parse_date(&ends_on)?,
        is_active: is_active != 0,
        reason,
    })
}

#[async_trait::async_trait]
impl DelegateRepository for SqlDelegateRepository {
    async fn insert(&self, grant: &DelegateGrant) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO approval_delegates (id, delegator_id, delegate_id, starts_on,
                                             ends_on, is_active, reason)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&grant.id)
        .bind(&grant.delegator_id.0)
        .bind(&grant.delegate_id.0)
        .bind(grant.starts_on.to_string())
        .bind(grant.ends_on.to_string())
        .bind(i64::from(grant.is_active))
        .bind(&grant.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_for(
        &self,
        delegator_id: &UserId,
        today: NaiveDate,
    ) -> Result<Option<DelegateGrant>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, delegator_id, delegate_id, starts_on, ends_on, is_active, reason
             FROM approval_delegates
             WHERE delegator_id = ? AND is_active = 1
               AND starts_on <= ? AND ends_on >= ?
             ORDER BY starts_on ASC
             LIMIT 1",
        )
        .bind(&delegator_id.0)
        .bind(today.to_string())
        .bind(today.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_grant(r)?)),
            None => Ok(None),
        }
    }

    async fn has_overlapping_active(
        &self,
        delegator_id: &UserId,
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM approval_delegates
             WHERE delegator_id = ? AND is_active = 1
               AND starts_on <= ? AND ends_on >= ?",
        )
        .bind(&delegator_id.0)
        .bind(ends_on.to_string())
        .bind(starts_on.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn deactivate(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approval_delegates SET is_active = 0 WHERE id = ? AND is_active = 1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use furlough_core::domain::approval::DelegateGrant;
    use furlough_core::domain::user::{Role, UserId, UserRecord};

    use super::SqlDelegateRepository;
    use crate::repositories::{DelegateRepository, DirectoryRepository, SqlDirectoryRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let users = SqlDirectoryRepository::new(pool.clone());
        for id in ["u-mgr", "u-peer"] {
            users
                .insert_user(&UserRecord {
                    id: UserId(id.to_string()),
                    full_name: id.to_string(),
                    email: format!("{id}@company.test"),
                    role: Role::Manager,
                    manager_id: None,
                    department_director_id: None,
                    department: None,
                    is_active: true,
                })
                .await
                .expect("seed user");
        }
        pool
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).expect("valid date")
    }

    fn grant(id: &str, starts: NaiveDate, ends: NaiveDate) -> DelegateGrant {
        DelegateGrant {
            id: id.to_string(),
            delegator_id: UserId("u-mgr".to_string()),
            delegate_id: UserId("u-peer".to_string()),
            starts_on: starts,
            ends_on: ends,
            is_active: true,
            reason: Some("parental leave cover".to_string()),
        }
    }

    #[tokio::test]
    async fn active_lookup_honors_window_and_activity() {
        let pool = setup().await;
        let repo = SqlDelegateRepository::new(pool);

        repo.insert(&grant("dg-1", date(5, 1), date(5, 10))).await.expect("insert");

        let found = repo
            .active_for(&UserId("u-mgr".to_string()), date(5, 5))
            .await
            .expect("lookup")
            .expect("in effect");
        assert_eq!(found.delegate_id.0, "u-peer");

        assert!(repo
            .active_for(&UserId("u-mgr".to_string()), date(5, 11))
            .await
            .expect("lookup")
            .is_none());

        assert!(repo.deactivate("dg-1").await.expect("deactivate"));
        assert!(repo
            .active_for(&UserId("u-mgr".to_string()), date(5, 5))
            .await
            .expect("lookup")
            .is_none());
        // Deactivation is idempotent from the caller's perspective.
        assert!(!repo.deactivate("dg-1").await.expect("deactivate again"));
    }

    #[tokio::test]
    async fn overlap_probe_sees_shared_days_only() {
        let pool = setup().await;
        let repo = SqlDelegateRepository::new(pool);

        repo.insert(&grant("dg-1", date(5, 1), date(5, 10))).await.expect("insert");

        assert!(repo
            .has_overlapping_active(&UserId("u-mgr".to_string()), date(5, 10), date(5, 20))
            .await
            .expect("probe"));
        assert!(!repo
            .has_overlapping_active(&UserId("u-mgr".to_string()), date(5, 11), date(5, 20))
            .await
            .expect("probe"));

        repo.deactivate("dg-1").await.expect("deactivate");
        assert!(!repo
            .has_overlapping_active(&UserId("u-mgr".to_string()), date(5, 5), date(5, 6))
            .await
            .expect("probe"));
    }
}
