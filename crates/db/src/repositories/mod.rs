use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use timetabler_core::domain::session::{SessionRecord, SessionToken};
use timetabler_core::domain::timetable::{
    NewTimetable, Timetable, TimetableId, TimetableStatus, TimetableSummary,
};
use timetabler_core::domain::user::{NewUser, User, UserId};

pub mod memory;
pub mod session;
pub mod timetable;
pub mod user;

pub use memory::InMemoryPortalRepository;
pub use session::SqlSessionRepository;
pub use timetable::SqlTimetableRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait TimetableRepository: Send + Sync {
    async fn insert(&self, timetable: NewTimetable) -> Result<Timetable, RepositoryError>;
    async fn find_by_id(&self, id: TimetableId) -> Result<Option<Timetable>, RepositoryError>;

    /// Every record with its owner's username, newest first.
    async fn list_all(
        &self,
        status: Option<TimetableStatus>,
    ) -> Result<Vec<TimetableSummary>, RepositoryError>;

    /// Records created by `owner`, newest first.
    async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Timetable>, RepositoryError>;

    /// Overwrite the status column only. Returns `false` when no row matched.
    async fn update_status(
        &self,
        id: TimetableId,
        status: TimetableStatus,
    ) -> Result<bool, RepositoryError>;

    async fn delete_for_owner(&self, owner: UserId) -> Result<u64, RepositoryError>;
    async fn delete_all(&self) -> Result<u64, RepositoryError>;
    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: SessionRecord) -> Result<(), RepositoryError>;
    async fn find(&self, token: &SessionToken) -> Result<Option<SessionRecord>, RepositoryError>;
    async fn delete(&self, token: &SessionToken) -> Result<bool, RepositoryError>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Number of records in each status. Statuses with no records report zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub review: u64,
}

impl StatusCounts {
    pub fn get(&self, status: TimetableStatus) -> u64 {
        match status {
            TimetableStatus::Pending => self.pending,
            TimetableStatus::Approved => self.approved,
            TimetableStatus::Rejected => self.rejected,
            TimetableStatus::Review => self.review,
        }
    }

    pub fn add(&mut self, status: TimetableStatus, count: u64) {
        match status {
            TimetableStatus::Pending => self.pending += count,
            TimetableStatus::Approved => self.approved += count,
            TimetableStatus::Rejected => self.rejected += count,
            TimetableStatus::Review => self.review += count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected + self.review
    }
}

/// Fixed-width UTC form so that text ordering matches time ordering.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    match DateTime::parse_from_rfc3339(&value) {
        Ok(timestamp) => Ok(timestamp.with_timezone(&Utc)),
        Err(error) => Err(RepositoryError::Decode(format!(
            "invalid timestamp in `{column}`: `{value}` ({error})"
        ))),
    }
}

/// Drop sub-microsecond precision so values survive a storage round trip.
pub(crate) fn truncate_to_storage_precision(value: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::{DurationRound, TimeDelta};

    value.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(value)
}
