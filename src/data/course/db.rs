use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::schedule::{Slot, TimeOfDay};
use super::{GroupSizePolicy, Semester, CLASS_CODE_LENGTH, MAX_STUDENTS, MIN_STUDENTS};
use crate::error::CoordError;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ClassCreateData {
    pub class_code: String,
    pub lecturer_id: Uuid,
    pub semester: String,
    pub year: u16,
    pub room: String,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub max_students: Option<u32>,
    #[serde(default)]
    pub group_size: Option<GroupSizePolicy>,
}

/// Moderator edit. Absent fields stay as they are; the class code is fixed
/// because users and groups refer to it.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ClassUpdateData {
    pub lecturer_id: Option<Uuid>,
    pub semester: Option<String>,
    pub year: Option<u16>,
    pub room: Option<String>,
    pub day_of_week: Option<u8>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub max_students: Option<u32>,
    pub group_size: Option<GroupSizePolicy>,
}

pub fn validate_class_code(code: &str) -> Result<String, CoordError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CoordError::validation("class_code", "Class code is required."));
    }
    if code.chars().count() != CLASS_CODE_LENGTH {
        return Err(CoordError::validation(
            "class_code",
            format!("Class code must be exactly {} characters.", CLASS_CODE_LENGTH),
        ));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoordError::validation(
            "class_code",
            "Class code may only contain letters and digits.",
        ));
    }
    Ok(code.to_ascii_uppercase())
}

pub fn validate_semester(semester: &str) -> Result<Semester, CoordError> {
    semester
        .parse()
        .map_err(|e: String| CoordError::validation("semester", e))
}

pub fn validate_room(room: &str) -> Result<String, CoordError> {
    crate::util::required(room)
        .map(str::to_string)
        .ok_or_else(|| CoordError::validation("room", "Room is required."))
}

pub fn validate_year(year: u16) -> Result<u16, CoordError> {
    if (2000..=2100).contains(&year) {
        Ok(year)
    } else {
        Err(CoordError::validation("year", "Year must be between 2000 and 2100."))
    }
}

pub fn validate_capacity(max_students: u32) -> Result<u32, CoordError> {
    if (MIN_STUDENTS..=MAX_STUDENTS).contains(&max_students) {
        Ok(max_students)
    } else {
        Err(CoordError::validation(
            "max_students",
            format!(
                "Capacity must be between {} and {} students.",
                MIN_STUDENTS, MAX_STUDENTS
            ),
        ))
    }
}

pub fn validate_group_size(policy: GroupSizePolicy) -> Result<GroupSizePolicy, CoordError> {
    if policy.min == 0 || policy.min > policy.max {
        return Err(CoordError::validation(
            "group_size",
            "Group size minimum must be at least 1 and not above the maximum.",
        ));
    }
    Ok(policy)
}

pub fn validate_slot(day_of_week: u8, start: &str, end: &str) -> Result<Slot, CoordError> {
    if !(1..=7).contains(&day_of_week) {
        return Err(CoordError::validation(
            "day_of_week",
            "Day of week must be between 1 and 7.",
        ));
    }
    let start: TimeOfDay = start
        .trim()
        .parse()
        .map_err(|e: String| CoordError::validation("start_time", e))?;
    let end: TimeOfDay = end
        .trim()
        .parse()
        .map_err(|e: String| CoordError::validation("end_time", e))?;
    if end <= start {
        return Err(CoordError::validation(
            "end_time",
            "End time must be after start time.",
        ));
    }

    Ok(Slot {
        day_of_week,
        start,
        end,
    })
}
