use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::store::Record;
use crate::data::user::UserSummary;

pub mod db;
pub mod schedule;

use schedule::{Slot, TimeOfDay};

pub const CLASS_COLLECTION_NAME: &str = "classes";
pub const CLASS_CODE_LENGTH: usize = 6;
pub const MIN_STUDENTS: u32 = 5;
pub const MAX_STUDENTS: u32 = 100;
/// No group may ever grow past this, whatever the class policy says.
pub const GROUP_HARD_CAP: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Semester {
    Spring,
    Summer,
    Fall,
}

impl FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SPRING" => Ok(Semester::Spring),
            "SUMMER" => Ok(Semester::Summer),
            "FALL" => Ok(Semester::Fall),
            _ => Err("Semester must be one of SPRING, SUMMER or FALL.".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupSizePolicy {
    pub min: u32,
    pub max: u32,
}

impl Default for GroupSizePolicy {
    fn default() -> Self {
        GroupSizePolicy { min: 3, max: 5 }
    }
}

impl GroupSizePolicy {
    /// Effective member cap of groups in a class.
    pub fn cap(&self) -> usize {
        (self.max as usize).clamp(1, GROUP_HARD_CAP)
    }
}

/// A scheduled class of the course.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub version: u64,

    pub class_code: String,
    pub course_name: String,
    pub course_code: String,
    pub lecturer: Uuid,
    pub created_by: Uuid,

    pub semester: Semester,
    pub year: u16,
    pub room: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,

    pub max_students: u32,
    #[serde(default)]
    pub enrolled_students: Vec<Uuid>,
    pub status: CourseStatus,
    #[serde(default)]
    pub group_size: GroupSizePolicy,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Record for Course {
    const COLLECTION: &'static str = CLASS_COLLECTION_NAME;
    const UNIQUE: &'static [&'static str] = &["class_code"];

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
        self.status = self.derived_status();
    }
}

impl Course {
    pub fn derived_status(&self) -> CourseStatus {
        if self.enrolled_students.len() >= self.max_students as usize {
            CourseStatus::Closed
        } else {
            CourseStatus::Open
        }
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_students.len() >= self.max_students as usize
    }

    pub fn is_enrolled(&self, student: Uuid) -> bool {
        self.enrolled_students.contains(&student)
    }

    pub fn slot(&self) -> Result<Slot, String> {
        Ok(Slot {
            day_of_week: self.day_of_week,
            start: self.start_time.parse::<TimeOfDay>()?,
            end: self.end_time.parse::<TimeOfDay>()?,
        })
    }
}

/// Class with its lecturer and creator resolved.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDetails {
    #[serde(flatten)]
    pub course: Course,
    pub lecturer_info: Option<UserSummary>,
    pub creator_info: Option<UserSummary>,
}
