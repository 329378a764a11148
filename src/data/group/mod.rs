use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::store::Record;

pub mod db;
pub mod status;

pub use status::{GroupAction, GroupStatus, IllegalGroupTransition};

pub const GROUP_COLLECTION_NAME: &str = "groups";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Member {
    pub user: Uuid,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Invite {
    pub user: Uuid,
    pub invited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JoinRequest {
    pub user: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// Project team inside one class.
///
/// `class_code` and `member_cap` are copied from the class when the group is
/// created and are not kept in sync afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub version: u64,

    pub name: String,
    pub class_code: String,
    pub course: Uuid,

    #[serde(default)]
    pub members: Vec<Member>,
    pub leader: Option<Uuid>,
    #[serde(default)]
    pub pending_invites: Vec<Invite>,
    #[serde(default)]
    pub pending_requests: Vec<JoinRequest>,
    #[serde(default)]
    pub status: GroupStatus,
    pub member_cap: u32,

    pub created_by: Uuid,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Record for Group {
    const COLLECTION: &'static str = GROUP_COLLECTION_NAME;

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn normalize(&mut self) {
        let action = if self.is_full() {
            GroupAction::Fill
        } else {
            GroupAction::Vacate
        };
        if let Ok(next) = self.status.apply(action) {
            self.status = next;
        }
    }
}

impl Group {
    pub fn new(name: impl ToString, class_code: impl ToString, course: Uuid, creator: Uuid, member_cap: u32) -> Group {
        let now = Utc::now();
        Group {
            id: Uuid::new_v4(),
            version: 0,
            name: name.to_string(),
            class_code: class_code.to_string(),
            course,
            members: vec![Member {
                user: creator,
                joined_at: now,
            }],
            leader: Some(creator),
            pending_invites: vec![],
            pending_requests: vec![],
            status: GroupStatus::Open,
            member_cap,
            created_by: creator,
            created: now,
        }
    }

    pub fn is_member(&self, user: Uuid) -> bool {
        self.members.iter().any(|it| it.user == user)
    }

    pub fn is_leader(&self, user: Uuid) -> bool {
        self.leader == Some(user)
    }

    pub fn is_invited(&self, user: Uuid) -> bool {
        self.pending_invites.iter().any(|it| it.user == user)
    }

    pub fn has_requested(&self, user: Uuid) -> bool {
        self.pending_requests.iter().any(|it| it.user == user)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.member_cap as usize
    }

    pub fn remove_invite(&mut self, user: Uuid) -> bool {
        let before = self.pending_invites.len();
        self.pending_invites.retain(|it| it.user != user);
        before != self.pending_invites.len()
    }

    pub fn remove_request(&mut self, user: Uuid) -> bool {
        let before = self.pending_requests.len();
        self.pending_requests.retain(|it| it.user != user);
        before != self.pending_requests.len()
    }

    pub fn remove_member(&mut self, user: Uuid) -> bool {
        let before = self.members.len();
        self.members.retain(|it| it.user != user);
        before != self.members.len()
    }

    pub fn add_member(&mut self, user: Uuid) {
        self.members.push(Member {
            user,
            joined_at: Utc::now(),
        });
    }

    /// Earliest-joined remaining member.
    pub fn senior_member(&self) -> Option<Uuid> {
        self.members
            .iter()
            .min_by_key(|it| it.joined_at)
            .map(|it| it.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_is_sole_member_and_leader() {
        let creator = Uuid::new_v4();
        let group = Group::new("Team", "SE1801", Uuid::new_v4(), creator, 5);
        assert!(group.is_member(creator));
        assert!(group.is_leader(creator));
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.status, GroupStatus::Open);
    }

    #[test]
    fn normalize_tracks_fill_level() {
        let mut group = Group::new("Team", "SE1801", Uuid::new_v4(), Uuid::new_v4(), 2);
        group.add_member(Uuid::new_v4());
        group.normalize();
        assert_eq!(group.status, GroupStatus::Full);

        let last = group.members[1].user;
        group.remove_member(last);
        group.normalize();
        assert_eq!(group.status, GroupStatus::Open);

        group.status = GroupStatus::Disbanded;
        group.normalize();
        assert_eq!(group.status, GroupStatus::Disbanded);
    }
}
