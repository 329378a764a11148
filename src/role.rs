use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Leader,
    Lecturer,
    Moderator,
}

impl Role {
    /// Students and group leaders share the student capabilities.
    pub fn is_student(self) -> bool {
        matches!(self, Role::Student | Role::Leader)
    }

    pub fn can(self, op: Operation) -> bool {
        op.allowed_roles().contains(&self)
    }
}

impl std::default::Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Leader => write!(f, "leader"),
            Role::Lecturer => write!(f, "lecturer"),
            Role::Moderator => write!(f, "moderator"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "leader" => Ok(Role::Leader),
            "lecturer" => Ok(Role::Lecturer),
            "moderator" => Ok(Role::Moderator),
            other => Err(format!("'{}' isn't a known role", other)),
        }
    }
}

/// Authenticated identity every coordinator operation runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(user: Uuid, role: Role) -> Caller {
        Caller { user, role }
    }
}

/// Every operation that requires a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateStaff,
    ManageUsers,
    CreateClass,
    UpdateClass,
    ViewRoster,
    Enroll,
    Unenroll,
    SwitchClass,
    CreateGroup,
    InviteToGroup,
    AcceptInvite,
    RejectInvite,
    RequestJoin,
    AcceptRequest,
    RejectRequest,
    CancelRequest,
    LeaveGroup,
    CloseGroup,
    CreateProject,
    UpdateProject,
    SubmitProject,
    DeleteProject,
    TrackMilestones,
    ReviewProject,
    GradeProject,
}

const STUDENTS: &[Role] = &[Role::Student, Role::Leader];
const LECTURERS: &[Role] = &[Role::Lecturer];
const MODERATORS: &[Role] = &[Role::Moderator];
const STAFF: &[Role] = &[Role::Lecturer, Role::Moderator];

impl Operation {
    /// Capability table.
    pub fn allowed_roles(self) -> &'static [Role] {
        use Operation::*;

        match self {
            CreateStaff | ManageUsers | CreateClass | UpdateClass => MODERATORS,
            ViewRoster => STAFF,
            Enroll | Unenroll | SwitchClass => STUDENTS,
            CreateGroup | InviteToGroup | AcceptInvite | RejectInvite | RequestJoin
            | AcceptRequest | RejectRequest | CancelRequest | LeaveGroup | CloseGroup => STUDENTS,
            CreateProject | UpdateProject | SubmitProject | DeleteProject | TrackMilestones => {
                STUDENTS
            }
            ReviewProject | GradeProject => LECTURERS,
        }
    }

    pub fn describe(self) -> &'static str {
        use Operation::*;

        match self {
            CreateStaff => "create staff accounts",
            ManageUsers => "manage users",
            CreateClass => "create classes",
            UpdateClass => "edit classes",
            ViewRoster => "view class rosters",
            Enroll => "enroll in classes",
            Unenroll => "leave classes",
            SwitchClass => "switch classes",
            CreateGroup => "create groups",
            InviteToGroup => "invite to groups",
            AcceptInvite => "accept group invitations",
            RejectInvite => "reject group invitations",
            RequestJoin => "request to join groups",
            AcceptRequest => "accept join requests",
            RejectRequest => "reject join requests",
            CancelRequest => "cancel join requests",
            LeaveGroup => "leave groups",
            CloseGroup => "close groups",
            CreateProject => "create projects",
            UpdateProject => "edit projects",
            SubmitProject => "submit projects",
            DeleteProject => "delete projects",
            TrackMilestones => "track project milestones",
            ReviewProject => "review projects",
            GradeProject => "grade projects",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_has_student_capabilities() {
        assert!(Role::Leader.can(Operation::Enroll));
        assert!(Role::Leader.can(Operation::InviteToGroup));
        assert!(Role::Student.can(Operation::CreateProject));
    }

    #[test]
    fn staff_capabilities_are_separated() {
        assert!(Role::Moderator.can(Operation::CreateClass));
        assert!(!Role::Lecturer.can(Operation::CreateClass));
        assert!(Role::Lecturer.can(Operation::ReviewProject));
        assert!(!Role::Moderator.can(Operation::ReviewProject));
        assert!(!Role::Lecturer.can(Operation::Enroll));
        assert!(Role::Lecturer.can(Operation::ViewRoster));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Lecturer".parse::<Role>(), Ok(Role::Lecturer));
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Moderator.to_string(), "moderator");
    }
}
