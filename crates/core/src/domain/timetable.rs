use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::errors::WorkflowError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimetableId(pub i64);

impl fmt::Display for TimetableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimetableStatus {
    Pending,
    Approved,
    Rejected,
    Review,
}

impl TimetableStatus {
    pub const ALL: [TimetableStatus; 4] = [
        TimetableStatus::Pending,
        TimetableStatus::Approved,
        TimetableStatus::Rejected,
        TimetableStatus::Review,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimetableStatus::Pending => "Pending",
            TimetableStatus::Approved => "Approved",
            TimetableStatus::Rejected => "Rejected",
            TimetableStatus::Review => "Review",
        }
    }
}

impl fmt::Display for TimetableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimetableStatus {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TimetableStatus::Pending),
            "approved" => Ok(TimetableStatus::Approved),
            "rejected" => Ok(TimetableStatus::Rejected),
            "review" => Ok(TimetableStatus::Review),
            _ => Err(WorkflowError::InvalidStatus(value.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    pub id: TimetableId,
    pub title: String,
    pub created_by: UserId,
    pub content: String,
    pub status: TimetableStatus,
    pub created_at: DateTime<Utc>,
}

/// Listing row: a timetable joined with its owner's username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableSummary {
    pub timetable: Timetable,
    pub owner_username: String,
}

/// What a scheduler actually submitted. Fields are optional because the
/// submission form may omit them; defaults are applied by the workflow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TimetableDraft {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Fully resolved record ready for insertion. Only the workflow engine
/// builds these, so status is always `Pending` on the way in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTimetable {
    pub title: String,
    pub created_by: UserId,
    pub content: String,
    pub status: TimetableStatus,
    pub created_at: DateTime<Utc>,
}
