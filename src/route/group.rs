use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::coordinator::Coordinator;
use crate::data::group::db::{GroupCreateData, InviteData};
use crate::data::group::Group;
use crate::data::user::UserResponse;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;

#[utoipa::path(
    request_body = GroupCreateData,
    responses(
        (status = 200, body = Group),
        (status = 400, description = "Already in a group", body = Problem),
        (status = 409, description = "Not attending any class", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/group", format = "application/json", data = "<group>")]
#[tracing::instrument(skip(coord))]
pub async fn group_create(
    group: Json<GroupCreateData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.create_group(&auth.caller(), group.into_inner()).await?))
}

#[utoipa::path(
    responses((status = 200, body = [Group])),
    security(("jwt" = []))
)]
#[get("/group/invites")]
#[tracing::instrument(skip(coord))]
pub async fn group_invites(
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Vec<Group>>, Problem> {
    Ok(Json(coord.my_invites(&auth.caller()).await?))
}

#[utoipa::path(
    responses((status = 200, body = Group), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[get("/group/<id>")]
#[tracing::instrument(skip(coord))]
pub async fn group_get(
    id: Uuid,
    _auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.get_group(id).await?))
}

#[utoipa::path(
    request_body = InviteData,
    responses(
        (status = 200, body = Group),
        (status = 400, description = "Student is taken, already invited or the group is full", body = Problem),
        (status = 403, description = "Caller doesn't lead the group", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/group/<id>/invite", format = "application/json", data = "<invite>")]
#[tracing::instrument(skip(coord))]
pub async fn group_invite(
    id: Uuid,
    invite: Json<InviteData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(
        coord
            .invite(&auth.caller(), id, &invite.student_id)
            .await?,
    ))
}

#[utoipa::path(
    responses(
        (status = 200, body = Group),
        (status = 400, body = Problem),
        (status = 404, description = "No invitation from this group", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/group/<id>/invite/accept")]
#[tracing::instrument(skip(coord))]
pub async fn group_invite_accept(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.accept_invite(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses((status = 200, body = UserResponse), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[post("/group/<id>/invite/reject")]
#[tracing::instrument(skip(coord))]
pub async fn group_invite_reject(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<UserResponse>, Problem> {
    Ok(Json(coord.reject_invite(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses(
        (status = 200, body = Group),
        (status = 400, body = Problem),
        (status = 409, description = "Group is closed or disbanded", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/group/<id>/request")]
#[tracing::instrument(skip(coord))]
pub async fn group_request(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.request_join(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses((status = 200, body = Group), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[delete("/group/<id>/request")]
#[tracing::instrument(skip(coord))]
pub async fn group_request_cancel(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.cancel_request(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses(
        (status = 200, body = Group),
        (status = 400, description = "Requester joined another group or the group is full", body = Problem),
        (status = 404, description = "No such join request", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/group/<id>/request/<user>/accept")]
#[tracing::instrument(skip(coord))]
pub async fn group_request_accept(
    id: Uuid,
    user: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.accept_request(&auth.caller(), id, user).await?))
}

#[utoipa::path(
    responses((status = 200, body = Group), (status = 403, body = Problem)),
    security(("jwt" = []))
)]
#[post("/group/<id>/request/<user>/reject")]
#[tracing::instrument(skip(coord))]
pub async fn group_request_reject(
    id: Uuid,
    user: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.reject_request(&auth.caller(), id, user).await?))
}

#[utoipa::path(
    responses(
        (status = 200, description = "The group as left behind", body = Group),
        (status = 409, description = "Caller isn't a member", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/group/<id>/leave")]
#[tracing::instrument(skip(coord))]
pub async fn group_leave(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.leave_group(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses((status = 200, body = Group), (status = 409, body = Problem)),
    security(("jwt" = []))
)]
#[post("/group/<id>/close")]
#[tracing::instrument(skip(coord))]
pub async fn group_close(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.close_group(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses((status = 200, body = Group), (status = 409, body = Problem)),
    security(("jwt" = []))
)]
#[post("/group/<id>/reopen")]
#[tracing::instrument(skip(coord))]
pub async fn group_reopen(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Group>, Problem> {
    Ok(Json(coord.reopen_group(&auth.caller(), id).await?))
}

///////////////////////
//       TESTS
///////////////////////
