use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_USER_IDS: &[&str] =
    &["u-ceo", "u-hr-1", "u-dir-eng", "u-mgr-app", "u-emp-ada", "u-emp-ben"];

/// Deterministic org fixture used by repository and service tests: a small
/// engineering department with a complete manager -> director -> HR chain,
/// two leave types, opening balances, escalation settings, and a holiday
/// calendar.
pub struct SeedOrg;

impl SeedOrg {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_org.sql");

    pub async fn load(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;
        Ok(())
    }

    pub fn user_ids() -> &'static [&'static str] {
        SEED_USER_IDS
    }
}
