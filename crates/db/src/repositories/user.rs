use sqlx::Row;

use fieldline_core::domain::user::User;

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_code: String =
        row.try_get("role_code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let territory: Option<String> =
        row.try_get("territory").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let region: Option<String> =
        row.try_get("region").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let zone: Option<String> =
        row.try_get("zone").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let state: Option<String> =
        row.try_get("state").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reports_to: Option<String> =
        row.try_get("reports_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User { id, name, role_code, territory, region, zone, state, reports_to })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, role_code, territory, region, zone, state, reports_to
             FROM app_user WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO app_user (id, name, role_code, territory, region, zone, state, reports_to)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 role_code = excluded.role_code,
                 territory = excluded.territory,
                 region = excluded.region,
                 zone = excluded.zone,
                 state = excluded.state,
                 reports_to = excluded.reports_to",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.role_code)
        .bind(&user.territory)
        .bind(&user.region)
        .bind(&user.zone)
        .bind(&user.state)
        .bind(&user.reports_to)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_subordinate_ids(&self, manager_id: &str) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> =
            sqlx::query("SELECT id FROM app_user WHERE reports_to = ? ORDER BY id ASC")
                .bind(manager_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter()
            .map(|row| row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use fieldline_core::domain::user::User;

    use super::SqlUserRepository;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_user(id: &str, role_code: &str, reports_to: Option<&str>) -> User {
        User {
            id: id.to_string(),
            name: format!("User {id}"),
            role_code: role_code.to_string(),
            territory: Some("North Delhi".to_string()),
            region: Some("Delhi NCR".to_string()),
            zone: Some("North".to_string()),
            state: Some("Delhi".to_string()),
            reports_to: reports_to.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let user = sample_user("U-100", "TSM", Some("U-200"));
        repo.save(user.clone()).await.expect("save");

        let found = repo.find_by_id("U-100").await.expect("find");
        assert_eq!(found, Some(user));

        let missing = repo.find_by_id("U-999").await.expect("find missing");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        repo.save(sample_user("U-100", "MDO", None)).await.expect("save");

        let mut promoted = sample_user("U-100", "TSM", Some("U-200"));
        promoted.name = "Asha Patil".to_string();
        repo.save(promoted).await.expect("upsert");

        let found = repo.find_by_id("U-100").await.expect("find").expect("should exist");
        assert_eq!(found.role_code, "TSM");
        assert_eq!(found.name, "Asha Patil");
    }

    #[tokio::test]
    async fn list_subordinate_ids_returns_direct_reports_only() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        repo.save(sample_user("U-001", "MDO", Some("U-100"))).await.expect("save 1");
        repo.save(sample_user("U-002", "MDO", Some("U-100"))).await.expect("save 2");
        repo.save(sample_user("U-003", "MDO", Some("U-101"))).await.expect("save 3");
        repo.save(sample_user("U-100", "TSM", Some("U-200"))).await.expect("save manager");

        let reports = repo.list_subordinate_ids("U-100").await.expect("list");
        assert_eq!(reports, vec!["U-001".to_string(), "U-002".to_string()]);
    }
}
