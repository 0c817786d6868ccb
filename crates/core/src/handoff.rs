use serde::{Deserialize, Serialize};

use crate::access::{AccessGate, Permission};
use crate::domain::timetable::TimetableId;
use crate::domain::user::Identity;
use crate::errors::AccessError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HandoffReason {
    Launch,
    Submitted { timetable_id: TimetableId },
}

/// Instruction to send the user to the external authoring tool. The core
/// never knows where that tool lives; the HTTP layer resolves the target
/// from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handoff {
    AuthoringTool(HandoffReason),
}

impl Handoff {
    pub fn launch(gate: &AccessGate, caller: &Identity) -> Result<Self, AccessError> {
        gate.require(caller, Permission::LaunchAuthoringTool)?;
        Ok(Self::AuthoringTool(HandoffReason::Launch))
    }

    pub fn after_submission(timetable_id: TimetableId) -> Self {
        Self::AuthoringTool(HandoffReason::Submitted { timetable_id })
    }

    pub fn reason(&self) -> HandoffReason {
        match self {
            Self::AuthoringTool(reason) => *reason,
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self.reason() {
            HandoffReason::Launch => "portal.handoff.launch",
            HandoffReason::Submitted { .. } => "portal.handoff.submitted",
        }
    }
}
