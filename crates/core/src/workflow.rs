//! Timetable status workflow.
//!
//! Pending is the only entry state. Admins may move a record from any status
//! to any other, including re-affirming the current one; there is no terminal
//! state and no transition history beyond the current status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{AccessGate, Permission};
use crate::domain::timetable::{
    NewTimetable, Timetable, TimetableDraft, TimetableId, TimetableStatus,
};
use crate::domain::user::{Identity, UserId};
use crate::errors::WorkflowError;

pub const DEFAULT_TITLE: &str = "Sample Timetable";
pub const DEFAULT_CONTENT: &str = "Timetable content here...";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub timetable_id: TimetableId,
    pub from: TimetableStatus,
    pub to: TimetableStatus,
}

impl StatusTransition {
    pub fn is_reaffirmation(&self) -> bool {
        self.from == self.to
    }
}

/// Which records a bulk clear is allowed to touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearScope {
    OwnedBy(UserId),
    All,
}

#[derive(Clone, Debug, Default)]
pub struct WorkflowEngine {
    gate: AccessGate,
}

impl WorkflowEngine {
    pub fn new(gate: AccessGate) -> Self {
        Self { gate }
    }

    pub fn initial_status(&self) -> TimetableStatus {
        TimetableStatus::Pending
    }

    /// Resolve a scheduler's submission into an insertable record. Missing or
    /// blank fields fall back to placeholders; the status is always Pending.
    pub fn submit(
        &self,
        caller: &Identity,
        draft: TimetableDraft,
        now: DateTime<Utc>,
    ) -> Result<NewTimetable, WorkflowError> {
        self.gate.require(caller, Permission::SubmitTimetable)?;

        Ok(NewTimetable {
            title: non_blank(draft.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            created_by: caller.user_id,
            content: non_blank(draft.content).unwrap_or_else(|| DEFAULT_CONTENT.to_string()),
            status: self.initial_status(),
            created_at: now,
        })
    }

    /// Authorize a transition request, then parse its raw target status.
    pub fn authorize_transition(
        &self,
        caller: &Identity,
        raw_target: &str,
    ) -> Result<TimetableStatus, WorkflowError> {
        self.gate.require(caller, Permission::TransitionStatus)?;
        raw_target.parse()
    }

    /// Overwrite the status of `timetable`. No other field is touched.
    pub fn transition(
        &self,
        caller: &Identity,
        timetable: &mut Timetable,
        target: TimetableStatus,
    ) -> Result<StatusTransition, WorkflowError> {
        self.gate.require(caller, Permission::TransitionStatus)?;

        let outcome =
            StatusTransition { timetable_id: timetable.id, from: timetable.status, to: target };
        timetable.status = target;
        Ok(outcome)
    }

    pub fn clear_own(&self, caller: &Identity) -> Result<ClearScope, WorkflowError> {
        self.gate.require(caller, Permission::ClearOwnHistory)?;
        Ok(ClearScope::OwnedBy(caller.user_id))
    }

    pub fn clear_all(&self, caller: &Identity) -> Result<ClearScope, WorkflowError> {
        self.gate.require(caller, Permission::ClearAllHistory)?;
        Ok(ClearScope::All)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{ClearScope, WorkflowEngine, DEFAULT_CONTENT, DEFAULT_TITLE};
    use crate::domain::timetable::{Timetable, TimetableDraft, TimetableId, TimetableStatus};
    use crate::domain::user::{Identity, Role, UserId};
    use crate::errors::{AccessError, WorkflowError};

    fn identity(id: i64, role: Role) -> Identity {
        Identity { user_id: UserId(id), username: format!("user-{id}"), role, department: None }
    }

    fn timetable(status: TimetableStatus) -> Timetable {
        Timetable {
            id: TimetableId(10),
            title: "Q1 Plan".to_string(),
            created_by: UserId(2),
            content: "draft text".to_string(),
            status,
            created_at: Utc::now() - Duration::days(1),
        }
    }

    #[test]
    fn submission_is_pending_and_owned_by_caller() {
        let now = Utc::now();
        let record = WorkflowEngine::default()
            .submit(
                &identity(2, Role::Scheduler),
                TimetableDraft {
                    title: Some("Q1 Plan".to_string()),
                    content: Some("draft text".to_string()),
                },
                now,
            )
            .expect("scheduler may submit");

        assert_eq!(record.status, TimetableStatus::Pending);
        assert_eq!(record.created_by, UserId(2));
        assert_eq!(record.title, "Q1 Plan");
        assert_eq!(record.content, "draft text");
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn submission_defaults_missing_and_blank_fields() {
        let record = WorkflowEngine::default()
            .submit(
                &identity(2, Role::Scheduler),
                TimetableDraft { title: None, content: Some("   ".to_string()) },
                Utc::now(),
            )
            .expect("scheduler may submit");

        assert_eq!(record.title, DEFAULT_TITLE);
        assert_eq!(record.content, DEFAULT_CONTENT);
    }

    #[test]
    fn only_schedulers_submit() {
        for role in [Role::Admin, Role::DeptHead] {
            let error = WorkflowEngine::default()
                .submit(&identity(1, role), TimetableDraft::default(), Utc::now())
                .expect_err("non-scheduler submission");
            assert!(matches!(error, WorkflowError::Access(AccessError::Forbidden { .. })));
        }
    }

    #[test]
    fn admin_transition_changes_only_status() {
        let engine = WorkflowEngine::default();
        let mut record = timetable(TimetableStatus::Pending);
        let before = record.clone();

        let outcome = engine
            .transition(&identity(1, Role::Admin), &mut record, TimetableStatus::Approved)
            .expect("admin may transition");

        assert_eq!(outcome.from, TimetableStatus::Pending);
        assert_eq!(outcome.to, TimetableStatus::Approved);
        assert_eq!(record.status, TimetableStatus::Approved);
        assert_eq!(record.title, before.title);
        assert_eq!(record.content, before.content);
        assert_eq!(record.created_by, before.created_by);
        assert_eq!(record.created_at, before.created_at);
    }

    #[test]
    fn any_status_can_reach_any_status() {
        let engine = WorkflowEngine::default();
        let admin = identity(1, Role::Admin);
        for from in TimetableStatus::ALL {
            for to in TimetableStatus::ALL {
                let mut record = timetable(from);
                let outcome = engine.transition(&admin, &mut record, to).expect("transition");
                assert_eq!(record.status, to);
                assert_eq!(outcome.is_reaffirmation(), from == to);
            }
        }
    }

    #[test]
    fn non_admin_transition_leaves_record_unchanged() {
        let engine = WorkflowEngine::default();
        for role in [Role::Scheduler, Role::DeptHead] {
            let mut record = timetable(TimetableStatus::Pending);
            let error = engine
                .transition(&identity(2, role), &mut record, TimetableStatus::Approved)
                .expect_err("forbidden");
            assert!(matches!(error, WorkflowError::Access(_)));
            assert_eq!(record.status, TimetableStatus::Pending);
        }
    }

    #[test]
    fn authorize_transition_checks_role_before_status() {
        let engine = WorkflowEngine::default();

        let error = engine
            .authorize_transition(&identity(2, Role::Scheduler), "not-a-status")
            .expect_err("forbidden first");
        assert!(matches!(error, WorkflowError::Access(_)));

        let error = engine
            .authorize_transition(&identity(1, Role::Admin), "not-a-status")
            .expect_err("invalid status");
        assert_eq!(error, WorkflowError::InvalidStatus("not-a-status".to_string()));

        let status = engine
            .authorize_transition(&identity(1, Role::Admin), "Review")
            .expect("valid status");
        assert_eq!(status, TimetableStatus::Review);
    }

    #[test]
    fn clear_scopes_follow_role() {
        let engine = WorkflowEngine::default();
        assert_eq!(
            engine.clear_own(&identity(5, Role::Scheduler)),
            Ok(ClearScope::OwnedBy(UserId(5)))
        );
        assert_eq!(engine.clear_all(&identity(1, Role::Admin)), Ok(ClearScope::All));
        assert!(engine.clear_all(&identity(5, Role::Scheduler)).is_err());
        assert!(engine.clear_own(&identity(1, Role::Admin)).is_err());
    }
}
