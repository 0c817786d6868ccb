use thiserror::Error;

use crate::access::Permission;
use crate::domain::timetable::TimetableId;
use crate::domain::user::Role;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("account carries unexpected role `{0}`")]
    UnexpectedRole(String),
    #[error("credential hashing failed: {0}")]
    Hashing(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("{permission:?} requires role {required} but caller has role {actual}")]
    Forbidden { permission: Permission, required: Role, actual: Role },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("`{0}` is not a timetable status (expected Pending|Approved|Rejected|Review)")]
    InvalidStatus(String),
    #[error("timetable {0} not found")]
    NotFound(TimetableId),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl ApplicationError {
    /// Message safe to show to the end user. Internal details stay in logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "Invalid username or password.",
            Self::Auth(AuthError::UnexpectedRole(_)) => "Invalid user role.",
            Self::Access(_) | Self::Workflow(WorkflowError::Access(_)) => {
                "You are not authorized to perform this action."
            }
            Self::Workflow(WorkflowError::InvalidStatus(_)) => "Unknown timetable status.",
            Self::Workflow(WorkflowError::NotFound(_)) => "Timetable not found.",
            Self::Auth(AuthError::Hashing(_)) => "An unexpected internal error occurred.",
        }
    }
}
