use serde::{Deserialize, Serialize};

use crate::domain::user::{Identity, Role};
use crate::errors::AccessError;

/// Every operation the portal gates. Adding a variant forces
/// `required_role` to say who may perform it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ViewAdminDashboard,
    ViewAllTimetables,
    TransitionStatus,
    ClearAllHistory,
    ViewDeptDashboard,
    ViewSchedulerDashboard,
    LaunchAuthoringTool,
    ViewOwnTimetables,
    SubmitTimetable,
    ClearOwnHistory,
}

impl Permission {
    pub fn required_role(&self) -> Role {
        match self {
            Self::ViewAdminDashboard
            | Self::ViewAllTimetables
            | Self::TransitionStatus
            | Self::ClearAllHistory => Role::Admin,
            Self::ViewDeptDashboard => Role::DeptHead,
            Self::ViewSchedulerDashboard
            | Self::LaunchAuthoringTool
            | Self::ViewOwnTimetables
            | Self::SubmitTimetable
            | Self::ClearOwnHistory => Role::Scheduler,
        }
    }

    /// Mutating operations answer a denial with 403; read-only pages
    /// redirect back to sign-in with a message instead.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::TransitionStatus
                | Self::ClearAllHistory
                | Self::SubmitTimetable
                | Self::ClearOwnHistory
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed,
    Denied { required: Role, actual: Role },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Role-based gate over an authenticated identity. Pure: it never touches
/// storage and never mutates the identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn check(&self, identity: &Identity, permission: Permission) -> AccessDecision {
        let required = permission.required_role();
        if identity.role == required {
            AccessDecision::Allowed
        } else {
            AccessDecision::Denied { required, actual: identity.role }
        }
    }

    pub fn require(&self, identity: &Identity, permission: Permission) -> Result<(), AccessError> {
        match self.check(identity, permission) {
            AccessDecision::Allowed => Ok(()),
            AccessDecision::Denied { required, actual } => {
                Err(AccessError::Forbidden { permission, required, actual })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessDecision, AccessGate, Permission};
    use crate::domain::user::{Identity, Role, UserId};
    use crate::errors::AccessError;

    const ALL_PERMISSIONS: [Permission; 10] = [
        Permission::ViewAdminDashboard,
        Permission::ViewAllTimetables,
        Permission::TransitionStatus,
        Permission::ClearAllHistory,
        Permission::ViewDeptDashboard,
        Permission::ViewSchedulerDashboard,
        Permission::LaunchAuthoringTool,
        Permission::ViewOwnTimetables,
        Permission::SubmitTimetable,
        Permission::ClearOwnHistory,
    ];

    fn identity(role: Role) -> Identity {
        Identity { user_id: UserId(1), username: "someone".to_string(), role, department: None }
    }

    #[test]
    fn each_permission_is_granted_to_exactly_one_role() {
        let gate = AccessGate;
        for permission in ALL_PERMISSIONS {
            let granted = Role::ALL
                .iter()
                .filter(|role| gate.check(&identity(**role), permission).is_allowed())
                .count();
            assert_eq!(granted, 1, "{permission:?} should be granted to a single role");
        }
    }

    #[test]
    fn scheduler_cannot_transition_status() {
        let decision = AccessGate.check(&identity(Role::Scheduler), Permission::TransitionStatus);
        assert_eq!(
            decision,
            AccessDecision::Denied { required: Role::Admin, actual: Role::Scheduler }
        );
    }

    #[test]
    fn username_does_not_grant_privileges() {
        let mut caller = identity(Role::Scheduler);
        caller.username = "admin".to_string();
        assert!(!AccessGate.check(&caller, Permission::ClearAllHistory).is_allowed());
    }

    #[test]
    fn require_reports_permission_and_roles() {
        let error = AccessGate
            .require(&identity(Role::DeptHead), Permission::SubmitTimetable)
            .expect_err("dept head cannot submit");
        assert_eq!(
            error,
            AccessError::Forbidden {
                permission: Permission::SubmitTimetable,
                required: Role::Scheduler,
                actual: Role::DeptHead,
            }
        );
    }

    #[test]
    fn mutating_permissions_are_flagged() {
        assert!(Permission::TransitionStatus.is_mutating());
        assert!(Permission::ClearOwnHistory.is_mutating());
        assert!(!Permission::ViewAdminDashboard.is_mutating());
        assert!(!Permission::LaunchAuthoringTool.is_mutating());
    }
}
