use std::collections::BTreeMap;

use sqlx::Row;

use super::{RepositoryError, SettingsRepository};
use crate::DbPool;

pub struct SqlSettingsRepository {
    pool: DbPool,
}

impl SqlSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SettingsRepository for SqlSettingsRepository {
    async fn all(&self) -> Result<BTreeMap<String, String>, RepositoryError> {
        let rows = sqlx::query("SELECT key, value FROM company_settings")
            .fetch_all(&self.pool)
            .await?;

        let mut settings = BTreeMap::new();
        for row in rows {
            let key: String =
                row.try_get("key").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let value: String =
                row.try_get("value").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            settings.insert(key, value);
        }
        Ok(settings)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO company_settings (key, value)
             VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use furlough_core::settings::{EscalationConfig, KEY_ESCALATION_BUSINESS_DAYS};

    use super::SqlSettingsRepository;
    use crate::repositories::SettingsRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn set_upserts_and_all_feeds_the_typed_config() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlSettingsRepository::new(pool);

        repo.set(KEY_ESCALATION_BUSINESS_DAYS, "5").await.expect("set");
        repo.set(KEY_ESCALATION_BUSINESS_DAYS, "7").await.expect("overwrite");

        let settings = repo.all().await.expect("all");
        let config = EscalationConfig::from_settings(&settings);
        assert_eq!(config.business_days_before_escalation, 7);
        assert!(config.enabled, "unset keys use defaults");
    }
}
