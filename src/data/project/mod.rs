use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::store::Record;

pub mod approval;
pub mod db;

pub use approval::{ApprovalAction, ApprovalStatus, IllegalApprovalTransition, ProjectStatus};

pub const PROJECT_COLLECTION_NAME: &str = "projects";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Milestone {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A group's project. `class_code` and `lecturer` are a snapshot of the
/// group's class at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub version: u64,

    pub group: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub repository_url: Option<String>,
    #[serde(default)]
    pub documentation: String,

    pub created_by: Uuid,
    pub class_code: String,
    pub lecturer: Uuid,

    #[serde(default)]
    pub approval_status: ApprovalStatus,
    pub approval_comment: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub grade: Option<f32>,
    pub feedback: Option<String>,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,
}

impl Record for Project {
    const COLLECTION: &'static str = PROJECT_COLLECTION_NAME;
    const UNIQUE: &'static [&'static str] = &["group"];

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
        self.updated = Utc::now();
    }
}

impl Project {
    /// Moves the approval state machine, keeping the lifecycle status in step.
    pub fn transition(&mut self, action: ApprovalAction) -> Result<(), IllegalApprovalTransition> {
        let next = self.approval_status.apply(action)?;
        self.approval_status = next;
        self.status = ProjectStatus::following(next);
        Ok(())
    }
}
