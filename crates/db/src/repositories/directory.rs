use sqlx::Row;

use furlough_core::domain::user::{UserId, UserRecord};

use super::{parse_enum, DirectoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDirectoryRepository {
    pool: DbPool,
}

impl SqlDirectoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, full_name, email, role, manager_id, department_director_id, department, is_active";

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let full_name: String =
        row.try_get("full_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String = row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let manager_id: Option<String> =
        row.try_get("manager_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department_director_id: Option<String> = row
        .try_get("department_director_id")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department: Option<String> =
        row.try_get("department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: i64 =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(UserRecord {
        id: UserId(id),
        full_name,
        email,
        role: parse_enum(&role)?,
        manager_id: manager_id.map(UserId),
        department_director_id: department_director_id.map(UserId),
        department,
        is_active: is_active != 0,
    })
}

#[async_trait::async_trait]
impl DirectoryRepository for SqlDirectoryRepository {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn active_fallback_candidates(&self) -> Result<Vec<UserRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE is_active = 1 AND role IN ('HR', 'EXECUTIVE')
             ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn direct_reports(
        &self,
        manager_id: &UserId,
    ) -> Result<Vec<UserRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE manager_id = ? AND is_active = 1
             ORDER BY id ASC"
        ))
        .bind(&manager_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn department_members(
        &self,
        director_id: &UserId,
    ) -> Result<Vec<UserRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE department_director_id = ? AND is_active = 1
             ORDER BY id ASC"
        ))
        .bind(&director_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, full_name, email, role, manager_id,
                                department_director_id, department, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 full_name = excluded.full_name,
                 email = excluded.email,
                 role = excluded.role,
                 manager_id = excluded.manager_id,
                 department_director_id = excluded.department_director_id,
                 department = excluded.department,
                 is_active = excluded.is_active",
        )
        .bind(&user.id.0)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role.to_string())
        .bind(user.manager_id.as_ref().map(|id| id.0.clone()))
        .bind(user.department_director_id.as_ref().map(|id| id.0.clone()))
        .bind(&user.department)
        .bind(i64::from(user.is_active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use furlough_core::domain::user::{Role, UserId, UserRecord};

    use super::SqlDirectoryRepository;
    use crate::repositories::DirectoryRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn user(id: &str, role: Role) -> UserRecord {
        UserRecord {
            id: UserId(id.to_string()),
            full_name: format!("User {id}"),
            email: format!("{id}@company.test"),
            role,
            manager_id: None,
            department_director_id: None,
            department: Some("engineering".to_string()),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn save_and_find_round_trips_the_record() {
        let pool = setup().await;
        let repo = SqlDirectoryRepository::new(pool);

        let mut manager = user("u-mgr", Role::Manager);
        repo.insert_user(&manager).await.expect("insert manager");

        let mut report = user("u-emp", Role::Employee);
        report.manager_id = Some(manager.id.clone());
        repo.insert_user(&report).await.expect("insert report");

        let found = repo.find_user(&report.id).await.expect("find").expect("should exist");
        assert_eq!(found, report);

        manager.full_name = "Renamed Manager".to_string();
        repo.insert_user(&manager).await.expect("upsert manager");
        let found = repo.find_user(&manager.id).await.expect("find").expect("exists");
        assert_eq!(found.full_name, "Renamed Manager");
    }

    #[tokio::test]
    async fn fallback_candidates_are_active_hr_or_executive_in_id_order() {
        let pool = setup().await;
        let repo = SqlDirectoryRepository::new(pool);

        repo.insert_user(&user("u-c-exec", Role::Executive)).await.expect("insert");
        repo.insert_user(&user("u-a-hr", Role::Hr)).await.expect("insert");
        repo.insert_user(&user("u-b-emp", Role::Employee)).await.expect("insert");
        let mut inactive = user("u-0-hr", Role::Hr);
        inactive.is_active = false;
        repo.insert_user(&inactive).await.expect("insert");

        let candidates = repo.active_fallback_candidates().await.expect("list");
        let ids: Vec<&str> = candidates.iter().map(|u| u.id.0.as_str()).collect();
        assert_eq!(ids, ["u-a-hr", "u-c-exec"]);
    }

    #[tokio::test]
    async fn team_scoping_follows_manager_and_director_links() {
        let pool = setup().await;
        let repo = SqlDirectoryRepository::new(pool);

        repo.insert_user(&user("u-mgr", Role::Manager)).await.expect("insert");
        repo.insert_user(&user("u-dir", Role::DepartmentDirector)).await.expect("insert");

        let mut a = user("u-a", Role::Employee);
        a.manager_id = Some(UserId("u-mgr".to_string()));
        a.department_director_id = Some(UserId("u-dir".to_string()));
        repo.insert_user(&a).await.expect("insert");

        let mut b = user("u-b", Role::Employee);
        b.department_director_id = Some(UserId("u-dir".to_string()));
        repo.insert_user(&b).await.expect("insert");

        let reports = repo.direct_reports(&UserId("u-mgr".to_string())).await.expect("reports");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id.0, "u-a");

        let members =
            repo.department_members(&UserId("u-dir".to_string())).await.expect("members");
        assert_eq!(members.len(), 2);
    }
}
