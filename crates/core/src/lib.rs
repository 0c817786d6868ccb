pub mod access;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod domain;
pub mod errors;
pub mod handoff;
pub mod workflow;

pub use access::{AccessDecision, AccessGate, Permission};
pub use dashboard::{Dashboard, DashboardRoute};
pub use domain::session::{SessionContext, SessionRecord, SessionToken};
pub use domain::timetable::{
    NewTimetable, Timetable, TimetableDraft, TimetableId, TimetableStatus, TimetableSummary,
};
pub use domain::user::{Identity, NewUser, Role, User, UserId};
pub use errors::{AccessError, ApplicationError, AuthError, WorkflowError};
pub use handoff::{Handoff, HandoffReason};
pub use workflow::{ClearScope, StatusTransition, WorkflowEngine};
