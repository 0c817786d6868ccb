use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use timetabler_core::domain::user::{NewUser, User, UserId};

use super::{
    format_timestamp, parse_timestamp, truncate_to_storage_precision, RepositoryError,
    UserRepository,
};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let created_at = truncate_to_storage_precision(user.created_at);
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, role, department, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_tag())
        .bind(&user.department)
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("username `{}` is taken", user.username))
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(User {
            id: UserId(result.last_insert_rowid()),
            username: user.username,
            password_hash: user.password_hash,
            role_tag: user.role.as_tag().to_string(),
            department: user.department,
            created_at,
        })
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, role, department, created_at
             FROM users WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, role, department, created_at
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        role_tag: row.try_get("role")?,
        department: row.try_get("department")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use timetabler_core::domain::user::{NewUser, Role};
    use timetabler_core::errors::AuthError;

    use super::SqlUserRepository;
    use crate::migrations;
    use crate::repositories::{RepositoryError, UserRepository};
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role,
            department: Some("Marketing".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sql_user_repo_round_trip() {
        let pool = setup_pool().await;
        let repo = SqlUserRepository::new(pool.clone());

        let created = repo.insert(new_user("alice", Role::Scheduler)).await.expect("insert");
        assert_eq!(created.role_tag, "Scheduler");

        let by_name = repo.find_by_username("alice").await.expect("find by name");
        assert_eq!(by_name, Some(created.clone()));

        let by_id = repo.find_by_id(created.id).await.expect("find by id");
        assert_eq!(by_id, Some(created));

        assert_eq!(repo.find_by_username("nobody").await.expect("lookup"), None);
        pool.close().await;
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let pool = setup_pool().await;
        let repo = SqlUserRepository::new(pool.clone());

        repo.insert(new_user("alice", Role::Scheduler)).await.expect("first insert");
        let error =
            repo.insert(new_user("alice", Role::Admin)).await.expect_err("duplicate username");
        assert!(matches!(error, RepositoryError::Conflict(_)));
        pool.close().await;
    }

    #[tokio::test]
    async fn rows_with_unknown_role_still_load() {
        let pool = setup_pool().await;
        sqlx::query(
            "INSERT INTO users (username, password_hash, role, created_at)
             VALUES ('mallory', 'x', 'Guest', '2026-01-01T00:00:00.000000Z')",
        )
        .execute(&pool)
        .await
        .expect("insert raw user");

        let repo = SqlUserRepository::new(pool.clone());
        let user = repo.find_by_username("mallory").await.expect("lookup").expect("present");
        assert_eq!(user.role(), Err(AuthError::UnexpectedRole("Guest".to_string())));
        pool.close().await;
    }
}
