use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{authorize, Coordinator};
use crate::data::course::db::{
    validate_capacity, validate_class_code, validate_group_size, validate_room,
    validate_semester, validate_slot, validate_year, ClassCreateData, ClassUpdateData,
};
use crate::data::course::schedule::{find_conflict, Slot};
use crate::data::course::{Course, CourseDetails, CourseStatus, Semester};
use crate::data::store::Filter;
use crate::data::user::{User, UserSummary};
use crate::error::{CoordError, StoreError};
use crate::role::{Caller, Operation, Role};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassQuery {
    pub semester: Option<Semester>,
    pub year: Option<u16>,
    pub lecturer: Option<Uuid>,
}

fn code_in_use(code: &str) -> CoordError {
    CoordError::conflict(format!("Class code {} is already in use.", code))
}

/// Lecturer, room and slot match, so a schedule scan over one still holds.
fn same_placement(a: &Course, b: &Course) -> bool {
    a.lecturer == b.lecturer
        && a.room == b.room
        && a.day_of_week == b.day_of_week
        && a.start_time == b.start_time
        && a.end_time == b.end_time
}

impl Coordinator {
    async fn assignable_lecturer(&self, id: Uuid) -> Result<User, CoordError> {
        let lecturer = self
            .store
            .users()
            .get(id)
            .await?
            .ok_or_else(|| CoordError::validation("lecturer_id", "Lecturer doesn't exist."))?;
        if lecturer.role != Role::Lecturer {
            return Err(CoordError::validation(
                "lecturer_id",
                "Assigned user isn't a lecturer.",
            ));
        }
        if !lecturer.active {
            return Err(CoordError::validation(
                "lecturer_id",
                "Lecturer account is deactivated.",
            ));
        }
        Ok(lecturer)
    }

    /// Rejects `slot` when it overlaps another class of `lecturer` or another
    /// class held in `room`.
    async fn check_schedule(
        &self,
        exclude: Option<Uuid>,
        lecturer: Uuid,
        room: &str,
        slot: Slot,
    ) -> Result<(), CoordError> {
        let same_day = self
            .store
            .courses()
            .find(Filter::new().eq("day_of_week", slot.day_of_week))
            .await?;
        match find_conflict(&same_day, exclude, lecturer, room, slot) {
            Some(conflict) => Err(CoordError::conflict(conflict.to_string())),
            None => Ok(()),
        }
    }

    async fn populate(&self, course: Course) -> Result<CourseDetails, CoordError> {
        let users = self.store.users();
        let lecturer_info = users.get(course.lecturer).await?.as_ref().map(UserSummary::from);
        let creator_info = users.get(course.created_by).await?.as_ref().map(UserSummary::from);
        Ok(CourseDetails {
            course,
            lecturer_info,
            creator_info,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_class(
        &self,
        caller: &Caller,
        data: ClassCreateData,
    ) -> Result<CourseDetails, CoordError> {
        authorize(caller, Operation::CreateClass)?;

        let class_code = validate_class_code(&data.class_code)?;
        let semester = validate_semester(&data.semester)?;
        let year = validate_year(data.year)?;
        let room = validate_room(&data.room)?;
        let slot = validate_slot(data.day_of_week, &data.start_time, &data.end_time)?;
        let max_students =
            validate_capacity(data.max_students.unwrap_or(self.policy.default_max_students))?;
        let group_size =
            validate_group_size(data.group_size.unwrap_or(self.policy.default_group_size))?;

        if self.course_by_code(&class_code).await?.is_some() {
            return Err(code_in_use(&class_code));
        }
        let lecturer = self.assignable_lecturer(data.lecturer_id).await?;
        self.check_schedule(None, lecturer.id, &room, slot).await?;

        let course = Course {
            id: Uuid::new_v4(),
            version: 0,
            class_code: class_code.clone(),
            course_name: self.policy.default_course_name.clone(),
            course_code: self.policy.default_course_code.clone(),
            lecturer: lecturer.id,
            created_by: caller.user,
            semester,
            year,
            room,
            day_of_week: slot.day_of_week,
            start_time: slot.start.to_string(),
            end_time: slot.end.to_string(),
            max_students,
            enrolled_students: vec![],
            status: CourseStatus::Open,
            group_size,
            created: Utc::now(),
        };

        let course = match self.store.courses().insert(course).await {
            Ok(course) => course,
            Err(StoreError::Duplicate { .. }) => return Err(code_in_use(&class_code)),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(class = %course.class_code, "class created");
        self.populate(course).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_class(
        &self,
        caller: &Caller,
        id: Uuid,
        data: ClassUpdateData,
    ) -> Result<CourseDetails, CoordError> {
        authorize(caller, Operation::UpdateClass)?;
        let current = self.course(id).await?;

        let semester = data.semester.as_deref().map(validate_semester).transpose()?;
        let year = data.year.map(validate_year).transpose()?;
        let room = data.room.as_deref().map(validate_room).transpose()?;
        let max_students = data.max_students.map(validate_capacity).transpose()?;
        let group_size = data.group_size.map(validate_group_size).transpose()?;

        let reschedules = data.day_of_week.is_some()
            || data.start_time.is_some()
            || data.end_time.is_some();
        let slot = validate_slot(
            data.day_of_week.unwrap_or(current.day_of_week),
            data.start_time.as_deref().unwrap_or(&current.start_time),
            data.end_time.as_deref().unwrap_or(&current.end_time),
        )?;

        let lecturer = match data.lecturer_id {
            Some(lecturer) if lecturer != current.lecturer => {
                Some(self.assignable_lecturer(lecturer).await?.id)
            }
            _ => None,
        };

        let rechecked = reschedules || lecturer.is_some() || room.is_some();
        if rechecked {
            self.check_schedule(
                Some(current.id),
                lecturer.unwrap_or(current.lecturer),
                room.as_deref().unwrap_or(&current.room),
                slot,
            )
            .await?;
        }

        let course = self
            .update_course(id, |course| {
                if rechecked && !same_placement(course, &current) {
                    return Err(CoordError::conflict(format!(
                        "Class {} was rescheduled concurrently, retry the edit.",
                        course.class_code
                    )));
                }
                if let Some(max) = max_students {
                    if (max as usize) < course.enrolled_students.len() {
                        return Err(CoordError::conflict(format!(
                            "{} students are already enrolled, capacity can't drop to {}.",
                            course.enrolled_students.len(),
                            max
                        )));
                    }
                    course.max_students = max;
                }
                if let Some(semester) = semester {
                    course.semester = semester;
                }
                if let Some(year) = year {
                    course.year = year;
                }
                if let Some(room) = &room {
                    course.room = room.clone();
                }
                if let Some(lecturer) = lecturer {
                    course.lecturer = lecturer;
                }
                if let Some(group_size) = group_size {
                    course.group_size = group_size;
                }
                if reschedules {
                    course.day_of_week = slot.day_of_week;
                    course.start_time = slot.start.to_string();
                    course.end_time = slot.end.to_string();
                }
                Ok(())
            })
            .await?;

        self.populate(course).await
    }

    pub async fn get_class(&self, id: Uuid) -> Result<CourseDetails, CoordError> {
        let course = self.course(id).await?;
        self.populate(course).await
    }

    pub async fn list_classes(&self, query: ClassQuery) -> Result<Vec<Course>, CoordError> {
        let mut filter = Filter::new();
        if let Some(semester) = query.semester {
            filter = filter.eq("semester", semester);
        }
        if let Some(year) = query.year {
            filter = filter.eq("year", year);
        }
        if let Some(lecturer) = query.lecturer {
            filter = filter.eq("lecturer", lecturer);
        }

        let mut classes = self.store.courses().find(filter).await?;
        classes.sort_by(|a, b| a.class_code.cmp(&b.class_code));
        Ok(classes)
    }

    /// Enrolled students. Lecturers only see the classes they teach.
    #[tracing::instrument(skip(self))]
    pub async fn class_roster(
        &self,
        caller: &Caller,
        id: Uuid,
    ) -> Result<Vec<UserSummary>, CoordError> {
        authorize(caller, Operation::ViewRoster)?;
        let course = self.course(id).await?;
        if caller.role == Role::Lecturer && course.lecturer != caller.user {
            return Err(CoordError::forbidden(
                "Only the lecturer of this class can see its roster.",
            ));
        }

        let mut roster = Vec::with_capacity(course.enrolled_students.len());
        for student in &course.enrolled_students {
            if let Some(user) = self.store.users().get(*student).await? {
                roster.push(UserSummary::from(&user));
            }
        }
        Ok(roster)
    }
}
