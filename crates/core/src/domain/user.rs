use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role tag carried by every account. Dispatch over roles is exhaustive; a
/// stored tag outside this set never resolves to a `Role`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    DeptHead,
    Scheduler,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::DeptHead, Role::Scheduler];

    /// Tag persisted in the `users.role` column.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::DeptHead => "Dept_Head",
            Role::Scheduler => "Scheduler",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::DeptHead => "Department Head",
            Role::Scheduler => "Scheduler",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Admin" => Ok(Role::Admin),
            "Dept_Head" => Ok(Role::DeptHead),
            "Scheduler" => Ok(Role::Scheduler),
            other => Err(AuthError::UnexpectedRole(other.to_string())),
        }
    }
}

/// Persisted account row. `role_tag` is kept verbatim so that rows written
/// outside the portal with an unknown tag can still be loaded and rejected
/// at sign-in rather than at decode time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role_tag: String,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Result<Role, AuthError> {
        self.role_tag.parse()
    }

    /// Build the authenticated principal for this account.
    pub fn identity(&self) -> Result<Identity, AuthError> {
        Ok(Identity {
            user_id: self.id,
            username: self.username.clone(),
            role: self.role()?,
            department: self.department.clone(),
        })
    }
}

/// Input for account provisioning; the password is hashed before storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Authenticated principal attached to a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub department: Option<String>,
}
