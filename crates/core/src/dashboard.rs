use serde::Serialize;

use crate::access::{AccessGate, Permission};
use crate::domain::timetable::TimetableSummary;
use crate::domain::user::{Identity, Role};
use crate::errors::AccessError;

/// Landing page for each role after sign-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DashboardRoute {
    Admin,
    DeptHead,
    Scheduler,
}

impl DashboardRoute {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admin,
            Role::DeptHead => Self::DeptHead,
            Role::Scheduler => Self::Scheduler,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Admin => "/admin-dashboard/",
            Self::DeptHead => "/dept-dashboard/",
            Self::Scheduler => "/scheduler-dashboard/",
        }
    }

    pub fn permission(&self) -> Permission {
        match self {
            Self::Admin => Permission::ViewAdminDashboard,
            Self::DeptHead => Permission::ViewDeptDashboard,
            Self::Scheduler => Permission::ViewSchedulerDashboard,
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Self::Admin => "dashboard_admin.html",
            Self::DeptHead => "dashboard_dept.html",
            Self::Scheduler => "dashboard_scheduler.html",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dashboard {
    Admin { username: String, role_label: &'static str, timetables: Vec<TimetableSummary> },
    DeptHead { username: String, role_label: &'static str, department: Option<String> },
    Scheduler { username: String, role_label: &'static str, department: Option<String> },
}

impl Dashboard {
    /// Build the dashboard for `route`. The caller must hold the route's
    /// permission. `listing` is only used by the admin view and must already
    /// be ordered newest first.
    pub fn assemble(
        gate: &AccessGate,
        identity: &Identity,
        route: DashboardRoute,
        listing: Vec<TimetableSummary>,
    ) -> Result<Self, AccessError> {
        gate.require(identity, route.permission())?;

        let username = identity.username.clone();
        let role_label = identity.role.label();
        Ok(match route {
            DashboardRoute::Admin => Self::Admin { username, role_label, timetables: listing },
            DashboardRoute::DeptHead => {
                Self::DeptHead { username, role_label, department: identity.department.clone() }
            }
            DashboardRoute::Scheduler => {
                Self::Scheduler { username, role_label, department: identity.department.clone() }
            }
        })
    }

    pub fn needs_listing(route: DashboardRoute) -> bool {
        matches!(route, DashboardRoute::Admin)
    }
}
