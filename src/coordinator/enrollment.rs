//! Moving students in and out of classes.
//!
//! Enrolling claims the class on the student first (`current_class` must be
//! empty at commit time), then takes a seat on the roster (the capacity check
//! runs against the freshly read roster). A lost seat race releases the claim
//! again. Leaving a class is made of idempotent steps without compensation, a
//! retry finishes whatever a failed attempt left behind.

use uuid::Uuid;

use super::saga::Saga;
use super::{authorize, Coordinator};
use crate::data::course::Course;
use crate::data::user::User;
use crate::error::CoordError;
use crate::role::{Caller, Operation};

fn class_full(course: &Course) -> CoordError {
    CoordError::conflict(format!("Class {} is full.", course.class_code))
}

/// Checks shared by enroll and the second half of switch-class.
fn check_can_enroll(student: &User, course: &Course, switching: bool) -> Result<(), CoordError> {
    if !student.active {
        return Err(CoordError::state("Your account is deactivated."));
    }
    let attends = student.current_class.as_deref() == Some(course.class_code.as_str());
    if attends || course.is_enrolled(student.id) {
        return Err(CoordError::conflict("You are already enrolled in this class."));
    }
    if !switching {
        if let Some(current) = &student.current_class {
            return Err(CoordError::conflict(format!(
                "You are already enrolled in class {}, switch classes instead.",
                current
            )));
        }
    }
    if course.is_full() {
        return Err(class_full(course));
    }
    Ok(())
}

impl Coordinator {
    #[tracing::instrument(skip(self))]
    pub async fn enroll(&self, caller: &Caller, course_id: Uuid) -> Result<Course, CoordError> {
        authorize(caller, Operation::Enroll)?;
        let course = self.course(course_id).await?;
        let student = self.user(caller.user).await?;
        check_can_enroll(&student, &course, false)?;

        let mut saga = Saga::new("enroll");
        self.join_class(&mut saga, student.id, &course).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unenroll(&self, caller: &Caller, course_id: Uuid) -> Result<Course, CoordError> {
        authorize(caller, Operation::Unenroll)?;
        let course = self.course(course_id).await?;
        let student = self.user(caller.user).await?;

        let attends = course.is_enrolled(student.id)
            || student.current_class.as_deref() == Some(course.class_code.as_str())
            || student.enrolled_classes.contains(&course.class_code);
        if !attends {
            return Err(CoordError::state("You aren't enrolled in this class."));
        }

        let mut saga = Saga::new("unenroll");
        self.leave_class(&mut saga, &student, &course.class_code, Some(&course))
            .await?;
        self.course(course_id).await
    }

    /// Leaves the current class (with its group) and enrolls in `course_id`.
    /// Every check on the new class runs before the first write; a failure in
    /// the enroll half is a partial failure, the student stays out of both.
    #[tracing::instrument(skip(self))]
    pub async fn switch_class(
        &self,
        caller: &Caller,
        course_id: Uuid,
    ) -> Result<Course, CoordError> {
        authorize(caller, Operation::SwitchClass)?;
        let target = self.course(course_id).await?;
        let student = self.user(caller.user).await?;
        check_can_enroll(&student, &target, true)?;

        let mut saga = Saga::new("switch-class");
        if let Some(current) = &student.current_class {
            let previous = self.course_by_code(current).await?;
            self.leave_class(&mut saga, &student, current, previous.as_ref())
                .await?;
        }
        self.join_class(&mut saga, student.id, &target).await
    }

    async fn join_class(
        &self,
        saga: &mut Saga,
        student: Uuid,
        course: &Course,
    ) -> Result<Course, CoordError> {
        let code = course.class_code.clone();

        let mut first_time = false;
        let claim = self
            .update_user(student, |user| {
                if let Some(current) = &user.current_class {
                    return Err(CoordError::conflict(format!(
                        "You are already enrolled in class {}.",
                        current
                    )));
                }
                first_time = !user.enrolled_classes.contains(&code);
                user.current_class = Some(code.clone());
                Ok(())
            })
            .await;
        if let Err(e) = claim {
            return Err(saga.fail("claim-class", e));
        }
        saga.commit("claim-class");

        let seat = self
            .update_course(course.id, |course| {
                if course.is_enrolled(student) {
                    return Err(CoordError::conflict("You are already enrolled in this class."));
                }
                if course.is_full() {
                    return Err(class_full(course));
                }
                course.enrolled_students.push(student);
                Ok(())
            })
            .await;

        match seat {
            Ok(course) => {
                saga.commit("join-roster");
                tracing::info!(%student, class = %course.class_code, "enrolled");
                Ok(course)
            }
            Err(e) => {
                let undo = self.release_class(student, &code, first_time);
                Err(saga.rollback("join-roster", e, 1, undo).await)
            }
        }
    }

    /// Clears `current_class` if it still points at `class_code`. With
    /// `forget` the code is dropped from the enrollment history too.
    async fn release_class(
        &self,
        student: Uuid,
        class_code: &str,
        forget: bool,
    ) -> Result<(), CoordError> {
        self.update_user(student, |user| {
            if user.current_class.as_deref() == Some(class_code) {
                user.current_class = None;
            }
            if forget {
                user.enrolled_classes.retain(|it| it != class_code);
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Roster, class pointer, then the group of that class. `course` is `None`
    /// when the class no longer resolves, only the student side is cleaned.
    async fn leave_class(
        &self,
        saga: &mut Saga,
        student: &User,
        class_code: &str,
        course: Option<&Course>,
    ) -> Result<(), CoordError> {
        if let Some(course) = course {
            let left = self
                .update_course(course.id, |course| {
                    course.enrolled_students.retain(|it| *it != student.id);
                    Ok(())
                })
                .await;
            if let Err(e) = left {
                return Err(saga.fail("leave-roster", e));
            }
            saga.commit("leave-roster");
        }

        if let Err(e) = self.release_class(student.id, class_code, true).await {
            return Err(saga.fail("release-class", e));
        }
        saga.commit("release-class");

        if let Some(group_id) = student.current_group {
            let group = match self.store.groups().get(group_id).await {
                Ok(group) => group,
                Err(e) => return Err(saga.fail("leave-group", e.into())),
            };
            match group {
                Some(group) if group.class_code == class_code => {
                    self.detach_member(saga, group.id, student.id).await?;
                }
                Some(_) => {}
                None => {
                    if let Err(e) = self.release_group(student.id, group_id).await {
                        return Err(saga.fail("release-group", e));
                    }
                    saga.commit("release-group");
                }
            }
        }

        tracing::info!(student = %student.id, class = %class_code, "left class");
        Ok(())
    }
}
