use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoordError;

pub const MAX_GROUP_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GroupCreateData {
    pub name: String,
    pub course_id: Uuid,
}

impl GroupCreateData {
    pub fn validated_name(&self) -> Result<String, CoordError> {
        let name = crate::util::required(&self.name)
            .ok_or_else(|| CoordError::validation("name", "Group name is required."))?;
        if name.chars().count() > MAX_GROUP_NAME_LENGTH {
            return Err(CoordError::validation(
                "name",
                format!(
                    "Group name can't be longer than {} characters.",
                    MAX_GROUP_NAME_LENGTH
                ),
            ));
        }
        Ok(name.to_string())
    }
}

/// Invitation target, by student identifier.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InviteData {
    pub student_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_bounded() {
        let data = |name: &str| GroupCreateData {
            name: name.to_string(),
            course_id: Uuid::new_v4(),
        };
        assert_eq!(data("  Team A ").validated_name().unwrap(), "Team A");
        assert!(data("   ").validated_name().is_err());
        assert!(data(&"x".repeat(101)).validated_name().is_err());
    }
}
