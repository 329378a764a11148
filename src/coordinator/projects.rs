use chrono::Utc;
use uuid::Uuid;

use super::{authorize, Coordinator};
use crate::data::project::db::{GradeData, MilestoneData, ProjectData, ProjectPatch};
use crate::data::project::{ApprovalAction, ApprovalStatus, Project, ProjectStatus};
use crate::data::store::Filter;
use crate::error::{CoordError, StoreError};
use crate::role::{Caller, Operation};

fn already_has_project() -> CoordError {
    CoordError::conflict("This group already has a project.")
}

fn ensure_reviewer(project: &Project, caller: &Caller) -> Result<(), CoordError> {
    if project.lecturer != caller.user {
        return Err(CoordError::forbidden(
            "Only the lecturer of this project's class can review it.",
        ));
    }
    Ok(())
}

fn ensure_not_completed(project: &Project) -> Result<(), CoordError> {
    if project.status == ProjectStatus::Completed {
        return Err(CoordError::state("This project is already completed."));
    }
    Ok(())
}

fn transition(project: &mut Project, action: ApprovalAction) -> Result<(), CoordError> {
    project
        .transition(action)
        .map_err(|e| CoordError::state(e.to_string()))
}

impl Coordinator {
    /// Loads the project, failing unless the caller leads its group.
    async fn led_project(&self, caller: &Caller, id: Uuid) -> Result<Project, CoordError> {
        let project = self.project(id).await?;
        let group = self.group(project.group).await?;
        if !group.is_leader(caller.user) {
            return Err(CoordError::forbidden(
                "Only the group leader can manage the project.",
            ));
        }
        Ok(project)
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_project(
        &self,
        caller: &Caller,
        group_id: Uuid,
        data: ProjectData,
    ) -> Result<Project, CoordError> {
        authorize(caller, Operation::CreateProject)?;
        let data = data.validate()?;
        let group = self.group(group_id).await?;
        if group.status.is_disbanded() {
            return Err(CoordError::state("This group has been disbanded."));
        }
        if !group.is_leader(caller.user) {
            return Err(CoordError::forbidden(
                "Only the group leader can create the project.",
            ));
        }

        let projects = self.store.projects();
        if projects
            .find_one(Filter::new().eq("group", group.id))
            .await?
            .is_some()
        {
            return Err(already_has_project());
        }
        let course = self
            .store
            .courses()
            .get(group.course)
            .await?
            .ok_or_else(|| CoordError::state("The group's class no longer exists."))?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            version: 0,
            group: group.id,
            name: data.name,
            description: data.description,
            objectives: data.objectives,
            tech_stack: data.tech_stack,
            repository_url: data.repository_url,
            documentation: data.documentation,
            created_by: caller.user,
            class_code: group.class_code.clone(),
            lecturer: course.lecturer,
            approval_status: ApprovalStatus::Draft,
            approval_comment: None,
            approved_by: None,
            approved_at: None,
            submitted_at: None,
            milestones: vec![],
            status: ProjectStatus::Draft,
            grade: None,
            feedback: None,
            created: now,
            updated: now,
        };

        match projects.insert(project).await {
            Ok(project) => {
                tracing::info!(project = %project.id, group = %group.id, "project created");
                Ok(project)
            }
            Err(StoreError::Duplicate { .. }) => Err(already_has_project()),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_project(
        &self,
        caller: &Caller,
        id: Uuid,
        patch: ProjectPatch,
    ) -> Result<Project, CoordError> {
        authorize(caller, Operation::UpdateProject)?;
        let project = self.led_project(caller, id).await?;
        if !project.approval_status.is_editable() {
            return Err(CoordError::state("Approved projects can't be edited."));
        }

        self.update_project_doc(id, |project| {
            if !project.approval_status.is_editable() {
                return Err(CoordError::state("Approved projects can't be edited."));
            }
            patch.apply_to(project)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn submit_project(&self, caller: &Caller, id: Uuid) -> Result<Project, CoordError> {
        authorize(caller, Operation::SubmitProject)?;
        self.led_project(caller, id).await?;

        self.update_project_doc(id, |project| {
            transition(project, ApprovalAction::Submit)?;
            project.submitted_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn approve_project(
        &self,
        caller: &Caller,
        id: Uuid,
        comment: Option<String>,
    ) -> Result<Project, CoordError> {
        authorize(caller, Operation::ReviewProject)?;
        let project = self.project(id).await?;
        ensure_reviewer(&project, caller)?;
        let comment = comment
            .as_deref()
            .and_then(crate::util::required)
            .map(str::to_string);

        let project = self
            .update_project_doc(id, |project| {
                transition(project, ApprovalAction::Approve)?;
                project.approval_comment = comment.clone();
                project.approved_by = Some(caller.user);
                project.approved_at = Some(Utc::now());
                Ok(())
            })
            .await?;
        tracing::info!(project = %project.id, "project approved");
        Ok(project)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject_project(
        &self,
        caller: &Caller,
        id: Uuid,
        comment: &str,
    ) -> Result<Project, CoordError> {
        authorize(caller, Operation::ReviewProject)?;
        let comment = crate::util::required(comment)
            .ok_or_else(|| CoordError::validation("comment", "A rejection needs a comment."))?
            .to_string();
        let project = self.project(id).await?;
        ensure_reviewer(&project, caller)?;

        self.update_project_doc(id, |project| {
            transition(project, ApprovalAction::Reject)?;
            project.approval_comment = Some(comment.clone());
            project.approved_by = None;
            project.approved_at = None;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_project(&self, caller: &Caller, id: Uuid) -> Result<(), CoordError> {
        authorize(caller, Operation::DeleteProject)?;
        self.led_project(caller, id).await?;

        self.delete_project_doc(id, |project| {
            if !project.approval_status.is_deletable() {
                return Err(CoordError::state(
                    "Projects waiting for or past approval can't be deleted.",
                ));
            }
            Ok(())
        })
        .await?;
        tracing::info!(project = %id, "project deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_milestone(
        &self,
        caller: &Caller,
        id: Uuid,
        data: MilestoneData,
    ) -> Result<Project, CoordError> {
        authorize(caller, Operation::TrackMilestones)?;
        let milestone = data.validate()?;
        self.led_project(caller, id).await?;

        self.update_project_doc(id, |project| {
            ensure_not_completed(project)?;
            project.milestones.push(milestone.clone());
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn complete_milestone(
        &self,
        caller: &Caller,
        id: Uuid,
        index: usize,
    ) -> Result<Project, CoordError> {
        authorize(caller, Operation::TrackMilestones)?;
        let project = self.project(id).await?;
        let group = self.group(project.group).await?;
        if !group.is_member(caller.user) {
            return Err(CoordError::forbidden(
                "Only group members can track milestones.",
            ));
        }

        self.update_project_doc(id, |project| {
            ensure_not_completed(project)?;
            let milestone = project
                .milestones
                .get_mut(index)
                .ok_or(CoordError::not_found("Milestone"))?;
            if !milestone.completed {
                milestone.completed = true;
                milestone.completed_at = Some(Utc::now());
            }
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn grade_project(
        &self,
        caller: &Caller,
        id: Uuid,
        data: GradeData,
    ) -> Result<Project, CoordError> {
        authorize(caller, Operation::GradeProject)?;
        data.validate()?;
        let project = self.project(id).await?;
        ensure_reviewer(&project, caller)?;

        let feedback = data
            .feedback
            .as_deref()
            .and_then(crate::util::required)
            .map(str::to_string);
        self.update_project_doc(id, |project| {
            if project.approval_status != ApprovalStatus::Approved {
                return Err(CoordError::state("Only approved projects can be graded."));
            }
            project.grade = Some(data.grade);
            project.feedback = feedback.clone();
            project.status = ProjectStatus::Completed;
            Ok(())
        })
        .await
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project, CoordError> {
        self.project(id).await
    }

    pub async fn project_for_group(&self, group_id: Uuid) -> Result<Project, CoordError> {
        self.store
            .projects()
            .find_one(Filter::new().eq("group", group_id))
            .await?
            .ok_or(CoordError::not_found("Project"))
    }

    /// Projects waiting for the calling lecturer's review.
    pub async fn pending_approvals(&self, caller: &Caller) -> Result<Vec<Project>, CoordError> {
        authorize(caller, Operation::ReviewProject)?;
        let mut projects = self
            .store
            .projects()
            .find(
                Filter::new()
                    .eq("lecturer", caller.user)
                    .eq("approval_status", ApprovalStatus::Pending),
            )
            .await?;
        projects.sort_by_key(|it| it.submitted_at);
        Ok(projects)
    }
}
