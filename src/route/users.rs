use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::data::user::db::{StaffCreateData, UserActiveData, UserSignupData};
use crate::data::user::UserResponse;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreatedResponse {
    pub user: UserResponse,
    /// Bearer token for the new account, also set as the auth cookie.
    pub token: String,
}

#[utoipa::path(
    request_body = UserSignupData,
    responses(
        (status = 200, description = "Account created", body = UserCreatedResponse),
        (status = 400, description = "Invalid or duplicate account data", body = Problem),
    )
)]
#[post("/user", format = "application/json", data = "<signup>")]
#[tracing::instrument(skip(cookies, coord, config))]
pub async fn user_create(
    signup: Json<UserSignupData>,
    cookies: &CookieJar<'_>,
    coord: &State<Coordinator>,
    config: &State<Config>,
) -> Result<Json<UserCreatedResponse>, Problem> {
    let user = coord.register(signup.into_inner()).await?;

    let urt = UserRoleToken::new(user.id, user.role);
    let token = urt.encode_jwt(&config.jwt_secret)?;
    cookies.add(urt.cookie(&config.jwt_secret)?);

    Ok(Json(UserCreatedResponse { user, token }))
}

#[utoipa::path(
    request_body = StaffCreateData,
    responses(
        (status = 200, description = "Staff account created", body = UserResponse),
        (status = 403, description = "Caller isn't a moderator", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/user/staff", format = "application/json", data = "<staff>")]
#[tracing::instrument(skip(coord))]
pub async fn staff_create(
    staff: Json<StaffCreateData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<UserResponse>, Problem> {
    Ok(Json(coord.create_staff(&auth.caller(), staff.into_inner()).await?))
}

#[utoipa::path(
    responses(
        (status = 200, body = UserResponse),
        (status = 404, body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/user/<id>")]
#[tracing::instrument(skip(coord))]
pub async fn user_get(
    id: Uuid,
    _auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<UserResponse>, Problem> {
    Ok(Json(coord.get_user(id).await?))
}

#[utoipa::path(
    request_body = UserActiveData,
    responses(
        (status = 200, body = UserResponse),
        (status = 403, body = Problem),
        (status = 409, description = "Moderators can't deactivate themselves", body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/user/<id>/active", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(coord))]
pub async fn user_set_active(
    id: Uuid,
    data: Json<UserActiveData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<UserResponse>, Problem> {
    Ok(Json(
        coord
            .set_user_active(&auth.caller(), id, data.active)
            .await?,
    ))
}

///////////////////////
//       TESTS
///////////////////////
