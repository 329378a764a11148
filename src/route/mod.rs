use std::collections::BTreeMap;

use rocket::serde::json::Json;
use rocket::{Build, Catcher, Request, Rocket, Route};

pub mod class;
pub mod group;
pub mod project;
pub mod users;

use class::*;
use group::*;
use project::*;
use users::*;

use utoipa::OpenApi;

use crate::data::course::db::{ClassCreateData, ClassUpdateData};
use crate::data::course::{Course, CourseDetails, CourseStatus, GroupSizePolicy, Semester};
use crate::data::group::db::{GroupCreateData, InviteData};
use crate::data::group::{Group, GroupStatus, Invite, JoinRequest, Member};
use crate::data::project::db::{GradeData, MilestoneData, ProjectData, ProjectPatch, ReviewData};
use crate::data::project::{ApprovalStatus, Milestone, Project, ProjectStatus};
use crate::data::user::db::{StaffCreateData, UserActiveData, UserSignupData};
use crate::data::user::{UserResponse, UserSummary};
use crate::resp::jwt::doc::JWTAuth;
use crate::resp::problem::{problems, Problem};
use crate::role::Role;

#[derive(OpenApi)]
#[openapi(
    paths(
        user_create,
        staff_create,
        user_get,
        user_set_active,
        class_create,
        class_update,
        class_get,
        class_list,
        class_roster,
        class_groups,
        class_enroll,
        class_unenroll,
        class_switch,
        group_create,
        group_invites,
        group_get,
        group_invite,
        group_invite_accept,
        group_invite_reject,
        group_request,
        group_request_cancel,
        group_request_accept,
        group_request_reject,
        group_leave,
        group_close,
        group_reopen,
        project_create,
        project_for_group,
        project_pending,
        project_get,
        project_update,
        project_delete,
        project_submit,
        project_approve,
        project_reject,
        milestone_add,
        milestone_complete,
        project_grade
    ),
    components(schemas(
        Role,
        UserResponse,
        UserSummary,
        UserSignupData,
        StaffCreateData,
        UserActiveData,
        UserCreatedResponse,
        Semester,
        CourseStatus,
        GroupSizePolicy,
        Course,
        CourseDetails,
        ClassCreateData,
        ClassUpdateData,
        GroupStatus,
        Member,
        Invite,
        JoinRequest,
        Group,
        GroupCreateData,
        InviteData,
        ApprovalStatus,
        ProjectStatus,
        Milestone,
        Project,
        ProjectData,
        ProjectPatch,
        ReviewData,
        MilestoneData,
        GradeData,
        Problem
    )),
    modifiers(&JWTAuth, &V1_PREFIX)
)]
pub struct ApiDocV1;

pub struct PathPrefix(pub &'static str);
static V1_PREFIX: PathPrefix = PathPrefix("/api/v1");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

#[get("/openapi.json")]
pub fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

pub fn api_v1() -> Vec<Route> {
    routes![
        openapi,
        user_create,
        staff_create,
        user_get,
        user_set_active,
        class_create,
        class_update,
        class_get,
        class_list,
        class_roster,
        class_groups,
        class_enroll,
        class_unenroll,
        class_switch,
        group_create,
        group_invites,
        group_get,
        group_invite,
        group_invite_accept,
        group_invite_reject,
        group_request,
        group_request_cancel,
        group_request_accept,
        group_request_reject,
        group_leave,
        group_close,
        group_reopen,
        project_create,
        project_for_group,
        project_pending,
        project_get,
        project_update,
        project_delete,
        project_submit,
        project_approve,
        project_reject,
        milestone_add,
        milestone_complete,
        project_grade
    ]
}

#[catch(400)]
fn bad_request() -> Problem {
    problems::parse_problem()
        .detail("Request is malformed.")
        .clone()
}

#[catch(401)]
fn unauthorized() -> Problem {
    problems::unauthorized()
}

#[catch(403)]
fn forbidden() -> Problem {
    problems::forbidden()
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Problem {
    problems::no_route()
        .instance_uri(req.uri().to_string())
        .clone()
}

#[catch(422)]
fn unprocessable() -> Problem {
    problems::parse_problem()
}

#[catch(500)]
fn internal() -> Problem {
    problems::internal()
}

pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, forbidden, not_found, unprocessable, internal]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/v1", api_v1())
        .register("/", catchers())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use uuid::Uuid;

    use super::UserCreatedResponse;
    use crate::config::{Config, StoreKind};
    use crate::coordinator::Coordinator;
    use crate::data::course::CourseDetails;
    use crate::data::store::MemoryStore;
    use crate::data::user::UserResponse;
    use crate::resp::jwt::UserRoleToken;

    pub async fn client() -> Client {
        let mut config = Config::default();
        config.store = StoreKind::Memory;
        config.jwt_secret = "test-secret".to_string();
        config.moderator_emails = vec!["moderator@example.com".to_string()];

        let rocket = crate::build(config, Arc::new(MemoryStore::new())).expect("valid backend");
        Client::tracked(rocket).await.expect("valid rocket instance")
    }

    pub fn bearer(token: &str) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {}", token))
    }

    /// Mints a token for an account without going through registration.
    pub fn token_for(client: &Client, user: &UserResponse) -> String {
        let config: &Config = client.rocket().state().unwrap();
        UserRoleToken::new(user.id, user.role)
            .encode_jwt(&config.jwt_secret)
            .unwrap()
    }

    pub async fn register(client: &Client, student_id: &str, email: &str) -> UserCreatedResponse {
        let response = client
            .post("/api/v1/user")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email,
                    "student_id": student_id,
                    "name": format!("User {}", student_id),
                    "password": "correct horse battery",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json().await.unwrap()
    }

    pub async fn staff(client: &Client, token: &str, staff_id: &str, email: &str) -> UserResponse {
        let response = client
            .post("/api/v1/user/staff")
            .header(ContentType::JSON)
            .header(bearer(token))
            .body(
                json!({
                    "email": email,
                    "student_id": staff_id,
                    "name": format!("Lecturer {}", staff_id),
                    "password": "correct horse battery",
                    "role": "lecturer",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json().await.unwrap()
    }

    /// Registers the moderator and a lecturer, and opens one class taught by
    /// that lecturer.
    pub async fn open_class(client: &Client) -> Uuid {
        let moderator = register(client, "MOD001", "moderator@example.com").await;
        let lecturer = staff(client, &moderator.token, "LT001", "lecturer@example.com").await;

        let response = client
            .post("/api/v1/class")
            .header(ContentType::JSON)
            .header(bearer(&moderator.token))
            .body(
                json!({
                    "class_code": "SE1801",
                    "lecturer_id": lecturer.id,
                    "semester": "SPRING",
                    "year": 2025,
                    "room": "AL-201",
                    "day_of_week": 1,
                    "start_time": "12:30",
                    "end_time": "14:45",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let details: CourseDetails = response.into_json().await.unwrap();
        details.course.id
    }

    pub async fn lecturer_of(client: &Client, class: Uuid) -> UserResponse {
        let coord: &Coordinator = client.rocket().state().unwrap();
        let details = coord.get_class(class).await.unwrap();
        coord.get_user(details.course.lecturer).await.unwrap()
    }

    #[rocket::async_test]
    async fn openapi_document_is_served() {
        let client = client().await;
        let response = client.get("/api/v1/openapi.json").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let doc: serde_json::Value = response.into_json().await.unwrap();
        assert!(doc["paths"]["/api/v1/class/{id}/enroll"].is_object());
        assert!(doc["components"]["securitySchemes"]["jwt"].is_object());
    }

    #[rocket::async_test]
    async fn unknown_routes_are_problems() {
        let client = client().await;
        let response = client.get("/api/v1/nothing-here").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(
            response.content_type(),
            Some(ContentType::new("application", "problem+json"))
        );
    }

    #[rocket::async_test]
    async fn malformed_bodies_are_problems() {
        let client = client().await;
        let response = client
            .post("/api/v1/user")
            .header(ContentType::JSON)
            .body(json!({ "email": "missing@fields.com" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        let problem: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(problem["status"], 422);
    }
}
