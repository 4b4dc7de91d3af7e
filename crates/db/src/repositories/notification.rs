use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use furlough_core::domain::user::UserId;
use furlough_core::effects::NotificationRequest;

use super::{parse_utc, NotificationRepository, RepositoryError};
use crate::DbPool;

/// A stored notification as the bell icon reads it back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn insert(&self, notification: &NotificationRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, body, link, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&notification.user_id.0)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<NotificationRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, kind, title, body, link, created_at, read_at
             FROM notifications
             WHERE user_id = ?
             ORDER BY created_at DESC",
        )
        .bind(&user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String =
                    row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let user_id: String =
                    row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let kind: String =
                    row.try_get("kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let title: String =
                    row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let body: String =
                    row.try_get("body").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let link: Option<String> =
                    row.try_get("link").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let created_at: String = row
                    .try_get("created_at")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                let read_at: Option<String> =
                    row.try_get("read_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

                Ok(NotificationRecord {
                    id,
                    user_id: UserId(user_id),
                    kind,
                    title,
                    body,
                    link,
                    created_at: parse_utc(&created_at)?,
                    read_at: read_at.as_deref().map(parse_utc).transpose()?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use furlough_core::domain::user::{Role, UserId, UserRecord};
    use furlough_core::effects::NotificationRequest;

    use super::SqlNotificationRepository;
    use crate::repositories::{
        DirectoryRepository, NotificationRepository, SqlDirectoryRepository,
    };
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn inserted_notifications_come_back_for_their_user_only() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let users = SqlDirectoryRepository::new(pool.clone());
        for id in ["u-a", "u-b"] {
            users
                .insert_user(&UserRecord {
                    id: UserId(id.to_string()),
                    full_name: id.to_string(),
                    email: format!("{id}@company.test"),
                    role: Role::Employee,
                    manager_id: None,
                    department_director_id: None,
                    department: None,
                    is_active: true,
                })
                .await
                .expect("seed user");
        }

        let repo = SqlNotificationRepository::new(pool);
        repo.insert(&NotificationRequest {
            user_id: UserId("u-a".to_string()),
            kind: "APPROVAL_ESCALATED".to_string(),
            title: "Approval escalated".to_string(),
            body: "A leave request now needs your decision.".to_string(),
            link: Some("/approvals".to_string()),
        })
        .await
        .expect("insert");

        let for_a = repo.list_for_user(&UserId("u-a".to_string())).await.expect("list");
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].kind, "APPROVAL_ESCALATED");
        assert!(for_a[0].read_at.is_none());

        let for_b = repo.list_for_user(&UserId("u-b".to_string())).await.expect("list");
        assert!(for_b.is_empty());
    }
}
