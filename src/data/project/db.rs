use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{Milestone, Project};
use crate::error::CoordError;

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_GRADE: f32 = 10.0;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProjectData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub documentation: String,
}

/// Partial edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub objectives: Option<Vec<String>>,
    pub tech_stack: Option<Vec<String>>,
    pub repository_url: Option<String>,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewData {
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MilestoneData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GradeData {
    pub grade: f32,
    #[serde(default)]
    pub feedback: Option<String>,
}

fn validate_name(name: &str) -> Result<String, CoordError> {
    let name = crate::util::required(name)
        .ok_or_else(|| CoordError::validation("name", "Project name is required."))?;
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CoordError::validation(
            "name",
            format!("Project name can't be longer than {} characters.", MAX_NAME_LENGTH),
        ));
    }
    Ok(name.to_string())
}

fn validate_tech_stack(stack: &[String]) -> Result<Vec<String>, CoordError> {
    stack
        .iter()
        .map(|it| {
            crate::util::required(it)
                .map(str::to_string)
                .ok_or_else(|| CoordError::validation("tech_stack", "Technologies can't be blank."))
        })
        .collect()
}

fn validate_repository(url: Option<&str>) -> Result<Option<String>, CoordError> {
    match url.map(str::trim).filter(|it| !it.is_empty()) {
        None => Ok(None),
        Some(url) if url.starts_with("https://") || url.starts_with("http://") => {
            Ok(Some(url.to_string()))
        }
        Some(_) => Err(CoordError::validation(
            "repository_url",
            "Repository URL must start with http:// or https://.",
        )),
    }
}

impl ProjectData {
    /// Validated and trimmed copy.
    pub fn validate(&self) -> Result<ProjectData, CoordError> {
        Ok(ProjectData {
            name: validate_name(&self.name)?,
            description: self.description.trim().to_string(),
            objectives: self
                .objectives
                .iter()
                .filter_map(|it| crate::util::required(it).map(str::to_string))
                .collect(),
            tech_stack: validate_tech_stack(&self.tech_stack)?,
            repository_url: validate_repository(self.repository_url.as_deref())?,
            documentation: self.documentation.clone(),
        })
    }
}

impl ProjectPatch {
    /// Validates the patch and applies it to `project`.
    pub fn apply_to(&self, project: &mut Project) -> Result<(), CoordError> {
        if let Some(name) = &self.name {
            project.name = validate_name(name)?;
        }
        if let Some(description) = &self.description {
            project.description = description.trim().to_string();
        }
        if let Some(objectives) = &self.objectives {
            project.objectives = objectives
                .iter()
                .filter_map(|it| crate::util::required(it).map(str::to_string))
                .collect();
        }
        if let Some(stack) = &self.tech_stack {
            project.tech_stack = validate_tech_stack(stack)?;
        }
        if let Some(url) = &self.repository_url {
            project.repository_url = validate_repository(Some(url.as_str()))?;
        }
        if let Some(documentation) = &self.documentation {
            project.documentation = documentation.clone();
        }
        Ok(())
    }
}

impl MilestoneData {
    pub fn validate(&self) -> Result<Milestone, CoordError> {
        let title = crate::util::required(&self.title)
            .ok_or_else(|| CoordError::validation("title", "Milestone title is required."))?;
        Ok(Milestone {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            deadline: self.deadline,
            completed: false,
            completed_at: None,
        })
    }
}

impl GradeData {
    pub fn validate(&self) -> Result<(), CoordError> {
        if !self.grade.is_finite() || !(0.0..=MAX_GRADE).contains(&self.grade) {
            return Err(CoordError::validation(
                "grade",
                format!("Grade must be between 0 and {}.", MAX_GRADE),
            ));
        }
        Ok(())
    }
}
