use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use timetabler_core::domain::timetable::{
    NewTimetable, Timetable, TimetableId, TimetableStatus, TimetableSummary,
};
use timetabler_core::domain::user::UserId;

use super::{
    format_timestamp, parse_timestamp, truncate_to_storage_precision, RepositoryError,
    StatusCounts, TimetableRepository,
};
use crate::DbPool;

pub struct SqlTimetableRepository {
    pool: DbPool,
}

impl SqlTimetableRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TimetableRepository for SqlTimetableRepository {
    async fn insert(&self, timetable: NewTimetable) -> Result<Timetable, RepositoryError> {
        let created_at = truncate_to_storage_precision(timetable.created_at);
        let result = sqlx::query(
            "INSERT INTO timetables (title, created_by, content, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&timetable.title)
        .bind(timetable.created_by.0)
        .bind(&timetable.content)
        .bind(timetable.status.as_str())
        .bind(format_timestamp(&created_at))
        .execute(&self.pool)
        .await?;

        Ok(Timetable {
            id: TimetableId(result.last_insert_rowid()),
            title: timetable.title,
            created_by: timetable.created_by,
            content: timetable.content,
            status: timetable.status,
            created_at,
        })
    }

    async fn find_by_id(&self, id: TimetableId) -> Result<Option<Timetable>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, created_by, content, status, created_at
             FROM timetables WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| timetable_from_row(&row)).transpose()
    }

    async fn list_all(
        &self,
        status: Option<TimetableStatus>,
    ) -> Result<Vec<TimetableSummary>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT t.id, t.title, t.created_by, t.content, t.status, t.created_at,
                            u.username AS owner_username
                     FROM timetables t JOIN users u ON u.id = t.created_by
                     WHERE t.status = ?
                     ORDER BY t.created_at DESC, t.id DESC",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT t.id, t.title, t.created_by, t.content, t.status, t.created_at,
                            u.username AS owner_username
                     FROM timetables t JOIN users u ON u.id = t.created_by
                     ORDER BY t.created_at DESC, t.id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(|row| {
                Ok(TimetableSummary {
                    timetable: timetable_from_row(row)?,
                    owner_username: row.try_get("owner_username")?,
                })
            })
            .collect()
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Timetable>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, created_by, content, status, created_at
             FROM timetables
             WHERE created_by = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(timetable_from_row).collect()
    }

    async fn update_status(
        &self,
        id: TimetableId,
        status: TimetableStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE timetables SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_owner(&self, owner: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM timetables WHERE created_by = ?")
            .bind(owner.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM timetables").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) AS count FROM timetables GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let status = parse_status(row.try_get("status")?)?;
            let count = row.try_get::<i64, _>("count")?;
            counts.add(status, u64::try_from(count).unwrap_or_default());
        }
        Ok(counts)
    }
}

fn timetable_from_row(row: &SqliteRow) -> Result<Timetable, RepositoryError> {
    Ok(Timetable {
        id: TimetableId(row.try_get("id")?),
        title: row.try_get("title")?,
        created_by: UserId(row.try_get("created_by")?),
        content: row.try_get("content")?,
        status: parse_status(row.try_get("status")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn parse_status(raw: String) -> Result<TimetableStatus, RepositoryError> {
    raw.parse()
        .map_err(|_| RepositoryError::Decode(format!("unknown timetable status `{raw}`")))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use timetabler_core::domain::timetable::{NewTimetable, TimetableId, TimetableStatus};
    use timetabler_core::domain::user::{NewUser, Role, User, UserId};

    use super::SqlTimetableRepository;
    use crate::migrations;
    use crate::repositories::{SqlUserRepository, TimetableRepository, UserRepository};
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn insert_user(pool: &DbPool, username: &str, role: Role) -> User {
        SqlUserRepository::new(pool.clone())
            .insert(NewUser {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                role,
                department: None,
                created_at: Utc::now(),
            })
            .await
            .expect("insert user")
    }

    fn draft(title: &str, owner: UserId, created_at: DateTime<Utc>) -> NewTimetable {
        NewTimetable {
            title: title.to_string(),
            created_by: owner,
            content: format!("{title} content"),
            status: TimetableStatus::Pending,
            created_at,
        }
    }

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let pool = setup_pool().await;
        let owner = insert_user(&pool, "alice", Role::Scheduler).await;
        let repo = SqlTimetableRepository::new(pool.clone());

        let created =
            repo.insert(draft("Q1", owner.id, Utc::now())).await.expect("insert timetable");
        let found = repo.find_by_id(created.id).await.expect("find");
        assert_eq!(found, Some(created));
        pool.close().await;
    }

    #[tokio::test]
    async fn listings_are_newest_first_with_owner_names() {
        let pool = setup_pool().await;
        let owner = insert_user(&pool, "alice", Role::Scheduler).await;
        let repo = SqlTimetableRepository::new(pool.clone());

        let base = ts("2026-02-01T08:00:00Z");
        let t1 = repo.insert(draft("t1", owner.id, base)).await.expect("t1");
        let t2 = repo.insert(draft("t2", owner.id, base + Duration::minutes(1))).await.expect("t2");
        let t3 = repo.insert(draft("t3", owner.id, base + Duration::minutes(2))).await.expect("t3");

        let listing = repo.list_all(None).await.expect("list all");
        let ids: Vec<_> = listing.iter().map(|summary| summary.timetable.id).collect();
        assert_eq!(ids, vec![t3.id, t2.id, t1.id]);
        assert!(listing.iter().all(|summary| summary.owner_username == "alice"));

        let own = repo.list_for_owner(owner.id).await.expect("list own");
        assert_eq!(own, vec![t3, t2, t1]);
        pool.close().await;
    }

    #[tokio::test]
    async fn identical_timestamps_fall_back_to_id_order() {
        let pool = setup_pool().await;
        let owner = insert_user(&pool, "alice", Role::Scheduler).await;
        let repo = SqlTimetableRepository::new(pool.clone());

        let at = ts("2026-02-01T08:00:00Z");
        let first = repo.insert(draft("a", owner.id, at)).await.expect("a");
        let second = repo.insert(draft("b", owner.id, at)).await.expect("b");

        let own = repo.list_for_owner(owner.id).await.expect("list own");
        assert_eq!(own.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        pool.close().await;
    }

    #[tokio::test]
    async fn update_status_touches_only_status() {
        let pool = setup_pool().await;
        let owner = insert_user(&pool, "alice", Role::Scheduler).await;
        let repo = SqlTimetableRepository::new(pool.clone());

        let created = repo.insert(draft("Q1", owner.id, Utc::now())).await.expect("insert");
        assert!(repo.update_status(created.id, TimetableStatus::Approved).await.expect("update"));

        let found = repo.find_by_id(created.id).await.expect("find").expect("present");
        assert_eq!(found.status, TimetableStatus::Approved);
        assert_eq!(found.title, created.title);
        assert_eq!(found.content, created.content);
        assert_eq!(found.created_by, created.created_by);
        assert_eq!(found.created_at, created.created_at);

        let missing = created.id.0 + 100;
        assert!(!repo
            .update_status(TimetableId(missing), TimetableStatus::Review)
            .await
            .expect("update missing"));
        pool.close().await;
    }

    #[tokio::test]
    async fn status_filter_and_counts() {
        let pool = setup_pool().await;
        let owner = insert_user(&pool, "alice", Role::Scheduler).await;
        let repo = SqlTimetableRepository::new(pool.clone());

        let a = repo.insert(draft("a", owner.id, Utc::now())).await.expect("a");
        repo.insert(draft("b", owner.id, Utc::now())).await.expect("b");
        repo.update_status(a.id, TimetableStatus::Rejected).await.expect("reject");

        let rejected = repo.list_all(Some(TimetableStatus::Rejected)).await.expect("filter");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].timetable.id, a.id);

        let counts = repo.count_by_status().await.expect("counts");
        assert_eq!(counts.get(TimetableStatus::Pending), 1);
        assert_eq!(counts.get(TimetableStatus::Rejected), 1);
        assert_eq!(counts.get(TimetableStatus::Approved), 0);
        assert_eq!(counts.total(), 2);
        pool.close().await;
    }

    #[tokio::test]
    async fn owner_scoped_clear_leaves_other_owners_rows() {
        let pool = setup_pool().await;
        let alice = insert_user(&pool, "alice", Role::Scheduler).await;
        let bob = insert_user(&pool, "bob", Role::Scheduler).await;
        let repo = SqlTimetableRepository::new(pool.clone());

        repo.insert(draft("a1", alice.id, Utc::now())).await.expect("a1");
        repo.insert(draft("a2", alice.id, Utc::now())).await.expect("a2");
        let b1 = repo.insert(draft("b1", bob.id, Utc::now())).await.expect("b1");

        assert_eq!(repo.list_for_owner(bob.id).await.expect("bob rows"), vec![b1.clone()]);
        assert_eq!(repo.list_for_owner(alice.id).await.expect("alice rows").len(), 2);

        assert_eq!(repo.delete_for_owner(alice.id).await.expect("clear alice"), 2);
        assert!(repo.list_for_owner(alice.id).await.expect("alice rows").is_empty());
        assert_eq!(repo.list_for_owner(bob.id).await.expect("bob rows"), vec![b1]);

        assert_eq!(repo.delete_all().await.expect("clear all"), 1);
        assert!(repo.list_all(None).await.expect("list").is_empty());
        pool.close().await;
    }

    #[tokio::test]
    async fn deleting_an_owner_cascades_to_timetables() {
        let pool = setup_pool().await;
        let alice = insert_user(&pool, "alice", Role::Scheduler).await;
        let repo = SqlTimetableRepository::new(pool.clone());
        repo.insert(draft("a1", alice.id, Utc::now())).await.expect("a1");

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(alice.id.0)
            .execute(&pool)
            .await
            .expect("delete user");

        assert!(repo.list_all(None).await.expect("list").is_empty());
        pool.close().await;
    }
}
