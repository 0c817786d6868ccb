use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::{Identity, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

/// Persisted half of a session: the token row in the `sessions` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: SessionToken,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn issue(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self { token: SessionToken::generate(), user_id, created_at: now, expires_at: now + ttl }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Explicit session context handed to every authenticated handler.
///
/// Created when a credential check succeeds and the account role resolves;
/// torn down on logout by deleting the backing record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionContext {
    pub token: SessionToken,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{SessionRecord, SessionToken};
    use crate::domain::user::UserId;

    #[test]
    fn generated_tokens_are_unique_hex() {
        let first = SessionToken::generate();
        let second = SessionToken::generate();
        assert_ne!(first, second);
        assert_eq!(first.0.len(), 32);
        assert!(first.0.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn issued_session_expires_after_ttl() {
        let now = Utc::now();
        let record = SessionRecord::issue(UserId(1), now, Duration::hours(8));
        assert!(!record.is_expired(now));
        assert!(!record.is_expired(now + Duration::hours(7)));
        assert!(record.is_expired(now + Duration::hours(8)));
    }
}
