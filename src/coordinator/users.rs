use uuid::Uuid;

use super::{authorize, Coordinator};
use crate::data::store::Filter;
use crate::data::user::db::{StaffCreateData, UserSignupData};
use crate::data::user::{User, UserResponse};
use crate::error::{CoordError, StoreError};
use crate::role::{Caller, Operation, Role};

fn duplicate_account() -> CoordError {
    CoordError::conflict("E-mail or student identifier is already registered.")
}

impl Coordinator {
    async fn create_account(
        &self,
        data: &UserSignupData,
        role: Role,
    ) -> Result<UserResponse, CoordError> {
        data.validate()?;

        let email = data.email.trim().to_ascii_lowercase();
        let users = self.store.users();
        if users
            .find_one(Filter::new().eq("email", &email))
            .await?
            .is_some()
        {
            return Err(duplicate_account());
        }

        let mut user = User::new(data.student_id.trim(), &email, data.name.trim(), &data.password, role);
        user.cohort = data
            .cohort
            .as_deref()
            .and_then(crate::util::required)
            .map(str::to_string);

        match users.insert(user).await {
            Ok(user) => {
                tracing::info!(user = %user.id, %role, "account created");
                Ok(user.into())
            }
            Err(StoreError::Duplicate { .. }) => Err(duplicate_account()),
            Err(e) => Err(e.into()),
        }
    }

    /// Public sign up. Accounts with a configured moderator e-mail become
    /// moderators, everyone else a student.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, data: UserSignupData) -> Result<UserResponse, CoordError> {
        let role = if self
            .moderator_emails
            .iter()
            .any(|it| it.eq_ignore_ascii_case(data.email.trim()))
        {
            Role::Moderator
        } else {
            Role::Student
        };
        self.create_account(&data, role).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_staff(
        &self,
        caller: &Caller,
        data: StaffCreateData,
    ) -> Result<UserResponse, CoordError> {
        authorize(caller, Operation::CreateStaff)?;
        if !matches!(data.role, Role::Lecturer | Role::Moderator) {
            return Err(CoordError::validation(
                "role",
                "Staff accounts are lecturers or moderators.",
            ));
        }
        self.create_account(&data.account, data.role).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_user_active(
        &self,
        caller: &Caller,
        id: Uuid,
        active: bool,
    ) -> Result<UserResponse, CoordError> {
        authorize(caller, Operation::ManageUsers)?;
        if caller.user == id && !active {
            return Err(CoordError::state("You can't deactivate your own account."));
        }

        let user = self
            .update_user(id, |user| {
                user.active = active;
                Ok(())
            })
            .await?;
        Ok(user.into())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, CoordError> {
        Ok(self.user(id).await?.into())
    }
}
