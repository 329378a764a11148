use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Open,
    Closed,
    Full,
    Disbanded,
}

impl Default for GroupStatus {
    fn default() -> Self {
        GroupStatus::Open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupAction {
    /// Member count reached the cap.
    Fill,
    /// Member count dropped below the cap.
    Vacate,
    Close,
    Reopen,
    Disband,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("group can't {action:?} while {from:?}")]
pub struct IllegalGroupTransition {
    pub from: GroupStatus,
    pub action: GroupAction,
}

impl GroupStatus {
    pub fn apply(self, action: GroupAction) -> Result<GroupStatus, IllegalGroupTransition> {
        use GroupAction::*;
        use GroupStatus::*;

        let next = match (self, action) {
            (Open, Fill) | (Full, Fill) => Full,
            (Open, Vacate) | (Full, Vacate) => Open,
            (Closed, Fill) | (Closed, Vacate) => Closed,
            (Open, Close) | (Full, Close) => Closed,
            (Closed, Reopen) => Open,
            (Open, Disband) | (Full, Disband) | (Closed, Disband) => Disbanded,
            (from, action) => return Err(IllegalGroupTransition { from, action }),
        };
        Ok(next)
    }

    pub fn is_disbanded(self) -> bool {
        self == GroupStatus::Disbanded
    }
}
