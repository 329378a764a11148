use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::CoordError;
use crate::role::Role;

#[derive(Clone, Deserialize, ToSchema)]
pub struct UserSignupData {
    #[schema(format = "email")]
    pub email: String,
    pub student_id: String,
    pub name: String,
    #[schema(format = "password")]
    pub password: String,
    #[serde(default)]
    pub cohort: Option<String>,
}

impl std::fmt::Debug for UserSignupData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserSignupData:{}", self.student_id)
    }
}

impl UserSignupData {
    pub fn validate(&self) -> Result<(), CoordError> {
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(CoordError::validation("email", "Not a valid e-mail address.")),
        }

        let student_id = self.student_id.trim();
        if student_id.len() < 3 || student_id.len() > 20 {
            return Err(CoordError::validation(
                "student_id",
                "Identifier must be between 3 and 20 characters long.",
            ));
        }
        if !student_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoordError::validation(
                "student_id",
                "Identifier may only contain letters and digits.",
            ));
        }

        if self.name.trim().is_empty() {
            return Err(CoordError::validation("name", "Name is required."));
        }
        if self.name.len() > 100 {
            return Err(CoordError::validation(
                "name",
                "Name can't be longer than 100 characters.",
            ));
        }

        if self.password.len() < 8 {
            return Err(CoordError::validation(
                "password",
                "Password must be at least 8 characters (bytes) long.",
            ));
        }
        if self.password.len() > 1024 {
            return Err(CoordError::validation(
                "password",
                "Passwords longer than 1024 characters aren't supported.",
            ));
        }

        Ok(())
    }
}

/// Account created by a moderator for a lecturer or another moderator.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StaffCreateData {
    #[serde(flatten)]
    pub account: UserSignupData,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserActiveData {
    pub active: bool,
}
