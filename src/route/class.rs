use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::coordinator::catalog::ClassQuery;
use crate::coordinator::Coordinator;
use crate::data::course::db::{ClassCreateData, ClassUpdateData};
use crate::data::course::{Course, CourseDetails};
use crate::data::group::Group;
use crate::data::user::UserSummary;
use crate::error::CoordError;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;

#[utoipa::path(
    request_body = ClassCreateData,
    responses(
        (status = 200, body = CourseDetails),
        (status = 400, description = "Invalid data, duplicate code or schedule conflict", body = Problem),
        (status = 403, body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/class", format = "application/json", data = "<class>")]
#[tracing::instrument(skip(coord))]
pub async fn class_create(
    class: Json<ClassCreateData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<CourseDetails>, Problem> {
    Ok(Json(coord.create_class(&auth.caller(), class.into_inner()).await?))
}

#[utoipa::path(
    request_body = ClassUpdateData,
    responses(
        (status = 200, body = CourseDetails),
        (status = 400, body = Problem),
        (status = 404, body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/class/<id>", format = "application/json", data = "<class>")]
#[tracing::instrument(skip(coord))]
pub async fn class_update(
    id: Uuid,
    class: Json<ClassUpdateData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<CourseDetails>, Problem> {
    Ok(Json(
        coord
            .update_class(&auth.caller(), id, class.into_inner())
            .await?,
    ))
}

#[utoipa::path(
    responses((status = 200, body = CourseDetails), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[get("/class/<id>")]
#[tracing::instrument(skip(coord))]
pub async fn class_get(
    id: Uuid,
    _auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<CourseDetails>, Problem> {
    Ok(Json(coord.get_class(id).await?))
}

#[utoipa::path(
    responses((status = 200, body = [Course]), (status = 400, body = Problem)),
    security(("jwt" = []))
)]
#[get("/class?<semester>&<year>&<lecturer>")]
#[tracing::instrument(skip(coord))]
pub async fn class_list(
    semester: Option<&str>,
    year: Option<u16>,
    lecturer: Option<Uuid>,
    _auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Vec<Course>>, Problem> {
    let semester = semester
        .map(str::parse)
        .transpose()
        .map_err(|e: String| CoordError::validation("semester", e))?;

    let query = ClassQuery {
        semester,
        year,
        lecturer,
    };
    Ok(Json(coord.list_classes(query).await?))
}

#[utoipa::path(
    responses(
        (status = 200, body = [UserSummary]),
        (status = 403, description = "Caller isn't the lecturer of record or a moderator", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/class/<id>/roster")]
#[tracing::instrument(skip(coord))]
pub async fn class_roster(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Vec<UserSummary>>, Problem> {
    Ok(Json(coord.class_roster(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses((status = 200, body = [Group]), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[get("/class/<id>/groups")]
#[tracing::instrument(skip(coord))]
pub async fn class_groups(
    id: Uuid,
    _auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Vec<Group>>, Problem> {
    Ok(Json(coord.list_class_groups(id).await?))
}

#[utoipa::path(
    responses(
        (status = 200, body = Course),
        (status = 400, description = "Already enrolled, in another class or class full", body = Problem),
        (status = 409, description = "Inactive account", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/class/<id>/enroll")]
#[tracing::instrument(skip(coord))]
pub async fn class_enroll(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Course>, Problem> {
    Ok(Json(coord.enroll(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses(
        (status = 200, body = Course),
        (status = 409, description = "Caller doesn't attend the class", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/class/<id>/unenroll")]
#[tracing::instrument(skip(coord))]
pub async fn class_unenroll(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Course>, Problem> {
    Ok(Json(coord.unenroll(&auth.caller(), id).await?))
}

#[utoipa::path(
    responses(
        (status = 200, description = "The class switched into", body = Course),
        (status = 400, body = Problem),
        (status = 500, description = "Switch left the student between classes", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/class/<id>/switch")]
#[tracing::instrument(skip(coord))]
pub async fn class_switch(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Course>, Problem> {
    Ok(Json(coord.switch_class(&auth.caller(), id).await?))
}

///////////////////////
//       TESTS
///////////////////////
