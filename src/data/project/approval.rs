use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lecturer review state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl Default for ApprovalStatus {
    fn default() -> Self {
        ApprovalStatus::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApprovalAction {
    Submit,
    Approve,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalApprovalTransition {
    #[error("project is already waiting for approval")]
    AlreadyPending,
    #[error("project is already approved")]
    AlreadyApproved,
    #[error("project isn't waiting for approval")]
    NotPending,
}

impl ApprovalStatus {
    pub fn apply(self, action: ApprovalAction) -> Result<ApprovalStatus, IllegalApprovalTransition> {
        use ApprovalAction::*;
        use ApprovalStatus::*;

        match (self, action) {
            (Draft, Submit) | (Rejected, Submit) => Ok(Pending),
            (Pending, Approve) => Ok(Approved),
            (Pending, Reject) => Ok(Rejected),
            (Pending, Submit) => Err(IllegalApprovalTransition::AlreadyPending),
            (Approved, _) => Err(IllegalApprovalTransition::AlreadyApproved),
            (Draft, _) | (Rejected, _) => Err(IllegalApprovalTransition::NotPending),
        }
    }

    /// Content edits are frozen once approved.
    pub fn is_editable(self) -> bool {
        self != ApprovalStatus::Approved
    }

    pub fn is_deletable(self) -> bool {
        !matches!(self, ApprovalStatus::Pending | ApprovalStatus::Approved)
    }
}

/// Lifecycle of the project work itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Draft,
    Submitted,
    InProgress,
    Completed,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Draft
    }
}

impl ProjectStatus {
    /// Lifecycle status that accompanies a new approval status.
    pub fn following(approval: ApprovalStatus) -> ProjectStatus {
        match approval {
            ApprovalStatus::Draft | ApprovalStatus::Rejected => ProjectStatus::Draft,
            ApprovalStatus::Pending => ProjectStatus::Submitted,
            ApprovalStatus::Approved => ProjectStatus::InProgress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApprovalAction::*;
    use super::ApprovalStatus::*;
    use super::*;

    #[test]
    fn happy_path() {
        let pending = Draft.apply(Submit).unwrap();
        assert_eq!(pending, Pending);
        assert_eq!(pending.apply(Approve), Ok(Approved));
        assert_eq!(pending.apply(Reject), Ok(Rejected));
        assert_eq!(Rejected.apply(Submit), Ok(Pending));
    }

    #[test]
    fn review_requires_pending() {
        assert_eq!(Draft.apply(Approve), Err(IllegalApprovalTransition::NotPending));
        assert_eq!(Rejected.apply(Reject), Err(IllegalApprovalTransition::NotPending));
        assert_eq!(Pending.apply(Submit), Err(IllegalApprovalTransition::AlreadyPending));
        for action in [Submit, Approve, Reject] {
            assert_eq!(
                Approved.apply(action),
                Err(IllegalApprovalTransition::AlreadyApproved)
            );
        }
    }

    #[test]
    fn edit_and_delete_guards() {
        assert!(Rejected.is_editable());
        assert!(Pending.is_editable());
        assert!(!Approved.is_editable());
        assert!(Draft.is_deletable());
        assert!(Rejected.is_deletable());
        assert!(!Pending.is_deletable());
        assert!(!Approved.is_deletable());
    }

    #[test]
    fn lifecycle_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ProjectStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }
}
