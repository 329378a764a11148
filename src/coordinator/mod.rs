//! Enrollment and membership coordination.
//!
//! Every operation runs as a [`Caller`], is authorized against the role
//! capability table first, evaluates all of its preconditions before the first
//! write, and then commits its writes one document at a time through
//! [`update_with`]. Operations that touch several documents track their steps
//! with a [`Saga`](saga::Saga) so a failure after the first commit is reported
//! as a partial failure instead of a clean one.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{Config, EnrollmentPolicy};
use crate::data::course::Course;
use crate::data::group::Group;
use crate::data::project::Project;
use crate::data::store::{delete_with, update_with, Collection, Filter, Record, Store};
use crate::data::user::User;
use crate::error::CoordError;
use crate::role::{Caller, Operation};

pub mod catalog;
pub mod enrollment;
pub mod groups;
pub mod projects;
pub(crate) mod saga;
pub mod users;

#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn Store>,
    policy: EnrollmentPolicy,
    moderator_emails: Vec<String>,
}

impl Coordinator {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Coordinator {
        Coordinator {
            store,
            policy: config.enrollment.clone(),
            moderator_emails: config.moderator_emails.clone(),
        }
    }

    async fn user(&self, id: Uuid) -> Result<User, CoordError> {
        self.store
            .users()
            .get(id)
            .await?
            .ok_or(CoordError::not_found("User"))
    }

    async fn course(&self, id: Uuid) -> Result<Course, CoordError> {
        self.store
            .courses()
            .get(id)
            .await?
            .ok_or(CoordError::not_found("Class"))
    }

    async fn course_by_code(&self, class_code: &str) -> Result<Option<Course>, CoordError> {
        Ok(self
            .store
            .courses()
            .find_one(Filter::new().eq("class_code", class_code))
            .await?)
    }

    async fn group(&self, id: Uuid) -> Result<Group, CoordError> {
        self.store
            .groups()
            .get(id)
            .await?
            .ok_or(CoordError::not_found("Group"))
    }

    async fn project(&self, id: Uuid) -> Result<Project, CoordError> {
        self.store
            .projects()
            .get(id)
            .await?
            .ok_or(CoordError::not_found("Project"))
    }

    /// Conditional single document write, see [`update_with`].
    async fn update<T, F>(
        &self,
        collection: &dyn Collection<T>,
        entity: &'static str,
        id: Uuid,
        apply: F,
    ) -> Result<T, CoordError>
    where
        T: Record,
        F: FnMut(&mut T) -> Result<(), CoordError> + Send,
    {
        update_with(collection, id, self.policy.write_attempts, apply)
            .await?
            .ok_or(CoordError::not_found(entity))
    }

    async fn update_user<F>(&self, id: Uuid, apply: F) -> Result<User, CoordError>
    where
        F: FnMut(&mut User) -> Result<(), CoordError> + Send,
    {
        self.update(self.store.users(), "User", id, apply).await
    }

    async fn update_course<F>(&self, id: Uuid, apply: F) -> Result<Course, CoordError>
    where
        F: FnMut(&mut Course) -> Result<(), CoordError> + Send,
    {
        self.update(self.store.courses(), "Class", id, apply).await
    }

    async fn update_group<F>(&self, id: Uuid, apply: F) -> Result<Group, CoordError>
    where
        F: FnMut(&mut Group) -> Result<(), CoordError> + Send,
    {
        self.update(self.store.groups(), "Group", id, apply).await
    }

    async fn update_project_doc<F>(&self, id: Uuid, apply: F) -> Result<Project, CoordError>
    where
        F: FnMut(&mut Project) -> Result<(), CoordError> + Send,
    {
        self.update(self.store.projects(), "Project", id, apply).await
    }

    /// Conditional delete, see [`delete_with`].
    async fn delete_project_doc<F>(&self, id: Uuid, check: F) -> Result<Project, CoordError>
    where
        F: FnMut(&Project) -> Result<(), CoordError> + Send,
    {
        delete_with(self.store.projects(), id, self.policy.write_attempts, check)
            .await?
            .ok_or(CoordError::not_found("Project"))
    }
}

pub(crate) fn authorize(caller: &Caller, op: Operation) -> Result<(), CoordError> {
    if caller.role.can(op) {
        Ok(())
    } else {
        Err(CoordError::forbidden(format!(
            "A {} can't {}.",
            caller.role,
            op.describe()
        )))
    }
}
