use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use uuid::Uuid;

use crate::coordinator::Coordinator;
use crate::data::project::db::{GradeData, MilestoneData, ProjectData, ProjectPatch, ReviewData};
use crate::data::project::Project;
use crate::resp::jwt::UserRoleToken;
use crate::resp::problem::Problem;

#[utoipa::path(
    request_body = ProjectData,
    responses(
        (status = 200, body = Project),
        (status = 400, description = "Invalid data or the group already has a project", body = Problem),
        (status = 403, description = "Caller doesn't lead the group", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/group/<group>/project", format = "application/json", data = "<project>")]
#[tracing::instrument(skip(coord))]
pub async fn project_create(
    group: Uuid,
    project: Json<ProjectData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(
        coord
            .create_project(&auth.caller(), group, project.into_inner())
            .await?,
    ))
}

#[utoipa::path(
    responses((status = 200, body = Project), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[get("/group/<group>/project")]
#[tracing::instrument(skip(coord))]
pub async fn project_for_group(
    group: Uuid,
    _auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(coord.project_for_group(group).await?))
}

#[utoipa::path(
    responses((status = 200, description = "Projects awaiting the caller's review", body = [Project])),
    security(("jwt" = []))
)]
#[get("/project/pending")]
#[tracing::instrument(skip(coord))]
pub async fn project_pending(
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Vec<Project>>, Problem> {
    Ok(Json(coord.pending_approvals(&auth.caller()).await?))
}

#[utoipa::path(
    responses((status = 200, body = Project), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[get("/project/<id>")]
#[tracing::instrument(skip(coord))]
pub async fn project_get(
    id: Uuid,
    _auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(coord.get_project(id).await?))
}

#[utoipa::path(
    request_body = ProjectPatch,
    responses(
        (status = 200, body = Project),
        (status = 409, description = "Approved projects are frozen", body = Problem),
    ),
    security(("jwt" = []))
)]
#[put("/project/<id>", format = "application/json", data = "<patch>")]
#[tracing::instrument(skip(coord))]
pub async fn project_update(
    id: Uuid,
    patch: Json<ProjectPatch>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(
        coord
            .update_project(&auth.caller(), id, patch.into_inner())
            .await?,
    ))
}

#[utoipa::path(
    responses(
        (status = 204, description = "Project deleted"),
        (status = 409, description = "Only draft or rejected projects can be deleted", body = Problem),
    ),
    security(("jwt" = []))
)]
#[delete("/project/<id>")]
#[tracing::instrument(skip(coord))]
pub async fn project_delete(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Status, Problem> {
    coord.delete_project(&auth.caller(), id).await?;
    Ok(Status::NoContent)
}

#[utoipa::path(
    responses((status = 200, body = Project), (status = 409, body = Problem)),
    security(("jwt" = []))
)]
#[post("/project/<id>/submit")]
#[tracing::instrument(skip(coord))]
pub async fn project_submit(
    id: Uuid,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(coord.submit_project(&auth.caller(), id).await?))
}

#[utoipa::path(
    request_body = ReviewData,
    responses(
        (status = 200, body = Project),
        (status = 403, description = "Caller isn't the lecturer of record", body = Problem),
        (status = 409, description = "Project isn't waiting for approval", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/project/<id>/approve", format = "application/json", data = "<review>")]
#[tracing::instrument(skip(coord))]
pub async fn project_approve(
    id: Uuid,
    review: Json<ReviewData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(
        coord
            .approve_project(&auth.caller(), id, review.into_inner().comment)
            .await?,
    ))
}

#[utoipa::path(
    request_body = ReviewData,
    responses(
        (status = 200, body = Project),
        (status = 400, description = "Rejections need a comment", body = Problem),
        (status = 409, body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/project/<id>/reject", format = "application/json", data = "<review>")]
#[tracing::instrument(skip(coord))]
pub async fn project_reject(
    id: Uuid,
    review: Json<ReviewData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    let comment = review.comment.as_deref().unwrap_or_default();
    Ok(Json(coord.reject_project(&auth.caller(), id, comment).await?))
}

#[utoipa::path(
    request_body = MilestoneData,
    responses((status = 200, body = Project), (status = 403, body = Problem)),
    security(("jwt" = []))
)]
#[post("/project/<id>/milestone", format = "application/json", data = "<milestone>")]
#[tracing::instrument(skip(coord))]
pub async fn milestone_add(
    id: Uuid,
    milestone: Json<MilestoneData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(
        coord
            .add_milestone(&auth.caller(), id, milestone.into_inner())
            .await?,
    ))
}

#[utoipa::path(
    responses((status = 200, body = Project), (status = 404, body = Problem)),
    security(("jwt" = []))
)]
#[post("/project/<id>/milestone/<index>/complete")]
#[tracing::instrument(skip(coord))]
pub async fn milestone_complete(
    id: Uuid,
    index: usize,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(
        coord
            .complete_milestone(&auth.caller(), id, index)
            .await?,
    ))
}

#[utoipa::path(
    request_body = GradeData,
    responses(
        (status = 200, body = Project),
        (status = 409, description = "Only approved projects are graded", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/project/<id>/grade", format = "application/json", data = "<grade>")]
#[tracing::instrument(skip(coord))]
pub async fn project_grade(
    id: Uuid,
    grade: Json<GradeData>,
    auth: UserRoleToken,
    coord: &State<Coordinator>,
) -> Result<Json<Project>, Problem> {
    Ok(Json(
        coord
            .grade_project(&auth.caller(), id, grade.into_inner())
            .await?,
    ))
}

///////////////////////
//       TESTS
///////////////////////

#[cfg(test)]
mod project_endpoints {
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use uuid::Uuid;

    use crate::data::group::Group;
    use crate::data::project::{ApprovalStatus, Project, ProjectStatus};
    use crate::route::tests::{bearer, client, lecturer_of, open_class, register, token_for};

    /// Leader token and group id of a one-member group in a fresh class.
    async fn group_with_leader(client: &Client, class: Uuid) -> (String, Uuid) {
        let leader = register(client, "SE170001", "leader@example.com").await;
        client
            .post(format!("/api/v1/class/{}/enroll", class))
            .header(bearer(&leader.token))
            .dispatch()
            .await;
        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .header(bearer(&leader.token))
            .body(json!({ "name": "Builders", "course_id": class }).to_string())
            .dispatch()
            .await;
        let group: Group = response.into_json().await.unwrap();
        (leader.token, group.id)
    }

    #[rocket::async_test]
    async fn v1_project_approval_round_trip() {
        let client = client().await;
        let class = open_class(&client).await;
        let lecturer = token_for(&client, &lecturer_of(&client, class).await);
        let (leader, group) = group_with_leader(&client, class).await;

        let response = client
            .post(format!("/api/v1/group/{}/project", group))
            .header(ContentType::JSON)
            .header(bearer(&leader))
            .body(
                json!({
                    "name": "Library kiosk",
                    "repository_url": "https://example.com/kiosk.git",
                    "tech_stack": ["rust"],
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let project: Project = response.into_json().await.unwrap();
        assert_eq!(project.approval_status, ApprovalStatus::Draft);

        let response = client
            .post(format!("/api/v1/group/{}/project", group))
            .header(ContentType::JSON)
            .header(bearer(&leader))
            .body(json!({ "name": "Second" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        client
            .post(format!("/api/v1/project/{}/submit", project.id))
            .header(bearer(&leader))
            .dispatch()
            .await;

        let response = client
            .get("/api/v1/project/pending")
            .header(bearer(&lecturer))
            .dispatch()
            .await;
        let pending: Vec<Project> = response.into_json().await.unwrap();
        assert_eq!(pending.len(), 1);

        let response = client
            .post(format!("/api/v1/project/{}/reject", project.id))
            .header(ContentType::JSON)
            .header(bearer(&lecturer))
            .body(json!({}).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
        let problem: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(problem["field"], "comment");

        let response = client
            .post(format!("/api/v1/project/{}/approve", project.id))
            .header(ContentType::JSON)
            .header(bearer(&lecturer))
            .body(json!({ "comment": "Go ahead." }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let project: Project = response.into_json().await.unwrap();
        assert_eq!(project.approval_status, ApprovalStatus::Approved);

        let response = client
            .delete(format!("/api/v1/project/{}", project.id))
            .header(bearer(&leader))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        let response = client
            .post(format!("/api/v1/project/{}/grade", project.id))
            .header(ContentType::JSON)
            .header(bearer(&lecturer))
            .body(json!({ "grade": 8.5, "feedback": "Solid." }).to_string())
            .dispatch()
            .await;
        let project: Project = response.into_json().await.unwrap();
        assert_eq!(project.status, ProjectStatus::Completed);
        assert_eq!(project.grade, Some(8.5));
    }

    #[rocket::async_test]
    async fn v1_draft_project_deletes() {
        let client = client().await;
        let class = open_class(&client).await;
        let (leader, group) = group_with_leader(&client, class).await;

        let response = client
            .post(format!("/api/v1/group/{}/project", group))
            .header(ContentType::JSON)
            .header(bearer(&leader))
            .body(json!({ "name": "Throwaway" }).to_string())
            .dispatch()
            .await;
        let project: Project = response.into_json().await.unwrap();

        let response = client
            .delete(format!("/api/v1/project/{}", project.id))
            .header(bearer(&leader))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        let response = client
            .get(format!("/api/v1/group/{}/project", group))
            .header(bearer(&leader))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
