//! Demo accounts for local evaluation of the portal.
//!
//! Provisioning is best-effort: every account is attempted, existing
//! usernames are skipped, and failures are reported instead of returned.

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{info, warn};

use timetabler_core::credentials::hash_password;
use timetabler_core::domain::user::{NewUser, Role};

use crate::repositories::UserRepository;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemoAccount {
    pub username: &'static str,
    pub password: &'static str,
    pub role: Role,
    pub department: Option<&'static str>,
}

pub struct DemoAccounts;

impl DemoAccounts {
    pub const ACCOUNTS: &'static [DemoAccount] = &[
        DemoAccount {
            username: "admin",
            password: "admin123",
            role: Role::Admin,
            department: None,
        },
        DemoAccount {
            username: "depthead",
            password: "dept123",
            role: Role::DeptHead,
            department: Some("Engineering"),
        },
        DemoAccount {
            username: "scheduler",
            password: "schedule123",
            role: Role::Scheduler,
            department: Some("Marketing"),
        },
    ];

    pub async fn provision(users: &dyn UserRepository, now: DateTime<Utc>) -> ProvisionReport {
        let mut entries = Vec::with_capacity(Self::ACCOUNTS.len());
        for account in Self::ACCOUNTS {
            let outcome = provision_one(users, account, now).await;
            match &outcome {
                ProvisionOutcome::Failed(message) => warn!(
                    event_name = "system.provision.failed",
                    username = account.username,
                    error = %message,
                    "demo account provisioning failed"
                ),
                other => info!(
                    event_name = "system.provision.account",
                    username = account.username,
                    outcome = %other,
                    "demo account processed"
                ),
            }
            entries.push(ProvisionEntry { username: account.username, outcome });
        }
        ProvisionReport { entries }
    }
}

async fn provision_one(
    users: &dyn UserRepository,
    account: &DemoAccount,
    now: DateTime<Utc>,
) -> ProvisionOutcome {
    match users.find_by_username(account.username).await {
        Ok(Some(_)) => return ProvisionOutcome::AlreadyPresent,
        Ok(None) => {}
        Err(error) => return ProvisionOutcome::Failed(error.to_string()),
    }

    let password = SecretString::from(account.password.to_string());
    let password_hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(error) => return ProvisionOutcome::Failed(error.to_string()),
    };

    let new_user = NewUser {
        username: account.username.to_string(),
        password_hash,
        role: account.role,
        department: account.department.map(str::to_string),
        created_at: now,
    };
    match users.insert(new_user).await {
        Ok(_) => ProvisionOutcome::Created,
        Err(error) => ProvisionOutcome::Failed(error.to_string()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyPresent,
    Failed(String),
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::AlreadyPresent => f.write_str("already present"),
            Self::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionEntry {
    pub username: &'static str,
    pub outcome: ProvisionOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionReport {
    pub entries: Vec<ProvisionEntry>,
}

impl ProvisionReport {
    pub fn created(&self) -> usize {
        self.entries.iter().filter(|entry| entry.outcome == ProvisionOutcome::Created).count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, ProvisionOutcome::Failed(_)))
            .count()
    }

    /// One line per account, e.g. `admin (Admin): created`.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                let role = DemoAccounts::ACCOUNTS
                    .iter()
                    .find(|account| account.username == entry.username)
                    .map(|account| account.role.as_tag())
                    .unwrap_or("?");
                format!("{} ({role}): {}", entry.username, entry.outcome)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
