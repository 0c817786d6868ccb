use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use timetabler_core::domain::session::{SessionRecord, SessionToken};
use timetabler_core::domain::timetable::{
    NewTimetable, Timetable, TimetableId, TimetableStatus, TimetableSummary,
};
use timetabler_core::domain::user::{NewUser, User, UserId};

use super::{
    truncate_to_storage_precision, RepositoryError, SessionRepository, StatusCounts,
    TimetableRepository, UserRepository,
};

/// Process-local store backing all three repositories, used by tests that do
/// not need SQLite. Ids are assigned monotonically like AUTOINCREMENT.
#[derive(Default)]
pub struct InMemoryPortalRepository {
    users: RwLock<Vec<User>>,
    timetables: RwLock<Vec<Timetable>>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
    next_user_id: RwLock<i64>,
    next_timetable_id: RwLock<i64>,
}

fn newest_first(left: &Timetable, right: &Timetable) -> std::cmp::Ordering {
    right.created_at.cmp(&left.created_at).then_with(|| right.id.cmp(&left.id))
}

#[async_trait::async_trait]
impl UserRepository for InMemoryPortalRepository {
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.username == user.username) {
            return Err(RepositoryError::Conflict(format!(
                "username `{}` is taken",
                user.username
            )));
        }

        let mut next_id = self.next_user_id.write().await;
        *next_id += 1;
        let created = User {
            id: UserId(*next_id),
            username: user.username,
            password_hash: user.password_hash,
            role_tag: user.role.as_tag().to_string(),
            department: user.department,
            created_at: truncate_to_storage_precision(user.created_at),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.username == username).cloned())
    }
}

#[async_trait::async_trait]
impl TimetableRepository for InMemoryPortalRepository {
    async fn insert(&self, timetable: NewTimetable) -> Result<Timetable, RepositoryError> {
        let owner_exists =
            self.users.read().await.iter().any(|user| user.id == timetable.created_by);
        if !owner_exists {
            return Err(RepositoryError::Conflict(format!(
                "owner {} does not exist",
                timetable.created_by
            )));
        }

        let mut next_id = self.next_timetable_id.write().await;
        *next_id += 1;
        let created = Timetable {
            id: TimetableId(*next_id),
            title: timetable.title,
            created_by: timetable.created_by,
            content: timetable.content,
            status: timetable.status,
            created_at: truncate_to_storage_precision(timetable.created_at),
        };
        self.timetables.write().await.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: TimetableId) -> Result<Option<Timetable>, RepositoryError> {
        let timetables = self.timetables.read().await;
        Ok(timetables.iter().find(|timetable| timetable.id == id).cloned())
    }

    async fn list_all(
        &self,
        status: Option<TimetableStatus>,
    ) -> Result<Vec<TimetableSummary>, RepositoryError> {
        let users = self.users.read().await;
        let mut timetables: Vec<Timetable> = self
            .timetables
            .read()
            .await
            .iter()
            .filter(|timetable| status.map_or(true, |wanted| timetable.status == wanted))
            .cloned()
            .collect();
        timetables.sort_by(newest_first);

        Ok(timetables
            .into_iter()
            .map(|timetable| {
                let owner_username = users
                    .iter()
                    .find(|user| user.id == timetable.created_by)
                    .map(|user| user.username.clone())
                    .unwrap_or_default();
                TimetableSummary { timetable, owner_username }
            })
            .collect())
    }

    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Timetable>, RepositoryError> {
        let mut timetables: Vec<Timetable> = self
            .timetables
            .read()
            .await
            .iter()
            .filter(|timetable| timetable.created_by == owner)
            .cloned()
            .collect();
        timetables.sort_by(newest_first);
        Ok(timetables)
    }

    async fn update_status(
        &self,
        id: TimetableId,
        status: TimetableStatus,
    ) -> Result<bool, RepositoryError> {
        let mut timetables = self.timetables.write().await;
        match timetables.iter_mut().find(|timetable| timetable.id == id) {
            Some(timetable) => {
                timetable.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_for_owner(&self, owner: UserId) -> Result<u64, RepositoryError> {
        let mut timetables = self.timetables.write().await;
        let before = timetables.len();
        timetables.retain(|timetable| timetable.created_by != owner);
        Ok((before - timetables.len()) as u64)
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let mut timetables = self.timetables.write().await;
        let removed = timetables.len() as u64;
        timetables.clear();
        Ok(removed)
    }

    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError> {
        let timetables = self.timetables.read().await;
        let mut counts = StatusCounts::default();
        for timetable in timetables.iter() {
            counts.add(timetable.status, 1);
        }
        Ok(counts)
    }
}

#[async_trait::async_trait]
impl SessionRepository for InMemoryPortalRepository {
    async fn insert(&self, session: SessionRecord) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.0.clone(), session);
        Ok(())
    }

    async fn find(&self, token: &SessionToken) -> Result<Option<SessionRecord>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&token.0).cloned())
    }

    async fn delete(&self, token: &SessionToken) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(&token.0).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}
