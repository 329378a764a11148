use std::fmt::{Display, Formatter};
use std::io::Cursor;

use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{CoordError, ErrorKind, StoreError};

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,
    pub instance_uri: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            instance_uri: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new(status: Status, type_uri: impl ToString, title: impl ToString) -> Problem {
        Problem {
            status,
            type_uri: type_uri.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            type_uri: "about:blank".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn instance_uri(&mut self, value: String) -> &mut Problem {
        self.instance_uri = Some(value);
        self
    }

    /// Values that fail to serialize are left out of the body.
    pub fn insert<V: Serialize>(&mut self, key: impl ToString, value: V) -> &mut Problem {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.body.insert(key.to_string(), value);
            }
            Err(e) => tracing::warn!("dropped problem member '{}': {}", key.to_string(), e),
        }
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    pub fn kind(&self) -> Option<&str> {
        self.body.get("kind").and_then(Value::as_str)
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.title)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut body = self.body;

        // Following are required by rfc7807
        body.insert(String::from("type"), Value::from(self.type_uri));
        body.insert(String::from("title"), Value::from(self.title));

        // Optional parameters as specified by rfc7807
        if let Some(detail) = self.detail {
            body.insert(String::from("detail"), Value::from(detail));
        }
        body.insert(String::from("status"), Value::from(self.status.code));
        if let Some(instance) = self.instance_uri {
            body.insert(String::from("instance"), Value::from(instance));
        }

        let body_string = serde_json::to_string(&body).map_err(|e| {
            tracing::error!("unable to serialize problem body: {}", e);
            Status::InternalServerError
        })?;

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header("Content-Language", "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn parse_problem() -> Problem {
        Problem::new_untyped(
            Status::UnprocessableEntity,
            "There was a problem parsing part of the request.",
        )
    }

    #[inline]
    pub fn no_route() -> Problem {
        Problem::new_untyped(Status::NotFound, "No such resource.")
    }

    #[inline]
    pub fn unauthorized() -> Problem {
        Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
    }

    #[inline]
    pub fn forbidden() -> Problem {
        Problem::new_untyped(Status::Forbidden, "Operation not permitted.")
    }

    #[inline]
    pub fn internal() -> Problem {
        Problem::new_untyped(
            Status::InternalServerError,
            "The server failed while processing the request.",
        )
    }
}

fn status_of(kind: ErrorKind) -> Status {
    match kind {
        ErrorKind::Validation | ErrorKind::Conflict => Status::BadRequest,
        ErrorKind::State => Status::Conflict,
        ErrorKind::Authorization => Status::Forbidden,
        ErrorKind::NotFound => Status::NotFound,
        ErrorKind::PartialFailure | ErrorKind::Internal => Status::InternalServerError,
    }
}

fn title_of(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "Request data is invalid.",
        ErrorKind::Conflict => "Request conflicts with existing data.",
        ErrorKind::Authorization => "Operation not permitted.",
        ErrorKind::NotFound => "Resource not found.",
        ErrorKind::State => "Operation not allowed in the current state.",
        ErrorKind::PartialFailure => "Operation was only partially applied.",
        ErrorKind::Internal => "The server failed while processing the request.",
    }
}

impl From<CoordError> for Problem {
    fn from(e: CoordError) -> Self {
        let kind = e.kind();
        let mut problem = Problem::new_untyped(status_of(kind), title_of(kind));
        problem.insert_str("kind", kind);

        match &e {
            CoordError::Validation { field, .. } => {
                problem.insert_str("field", field);
            }
            CoordError::PartialFailure {
                operation,
                step,
                completed,
                ..
            } => {
                tracing::error!(%operation, %step, ?completed, "partial failure: {}", e);
                problem
                    .insert_str("operation", operation)
                    .insert_str("step", step)
                    .insert("completed", completed);
            }
            CoordError::Store(StoreError::Duplicate { .. }) => {}
            CoordError::Store(store) => {
                // Driver messages stay in the log.
                tracing::error!("store failure: {}", store);
                return problem.clone();
            }
            _ => {}
        }

        problem.detail(e.to_string()).clone()
    }
}

impl From<StoreError> for Problem {
    fn from(e: StoreError) -> Self {
        Problem::from(CoordError::from(e))
    }
}

impl From<jsonwebtoken::errors::Error> for Problem {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.into_kind() {
            ErrorKind::ExpiredSignature => {
                Problem::new_untyped(Status::Unauthorized, "Expired JWT signature.")
            }
            _ => Problem::new_untyped(Status::Unauthorized, "Error while handling JWT."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_errors_map_to_statuses() {
        let cases = [
            (CoordError::validation("email", "bad"), Status::BadRequest),
            (CoordError::conflict("taken"), Status::BadRequest),
            (CoordError::state("closed"), Status::Conflict),
            (CoordError::forbidden("no"), Status::Forbidden),
            (CoordError::not_found("Group"), Status::NotFound),
        ];
        for (error, status) in cases {
            assert_eq!(Problem::from(error).status, status);
        }
    }

    #[test]
    fn validation_problem_names_the_field() {
        let problem = Problem::from(CoordError::validation("email", "E-mail is required."));
        assert_eq!(problem.kind(), Some("validation"));
        assert_eq!(problem.body.get("field"), Some(&Value::from("email")));
    }

    #[test]
    fn partial_failure_lists_committed_steps() {
        let problem = Problem::from(CoordError::PartialFailure {
            operation: "switch-class",
            step: "join-roster",
            completed: vec!["leave-roster", "release-class"],
            source: Box::new(CoordError::conflict("Class is full.")),
        });
        assert_eq!(problem.status, Status::InternalServerError);
        assert_eq!(problem.kind(), Some("partial_failure"));
        assert_eq!(
            problem.body.get("completed"),
            Some(&serde_json::json!(["leave-roster", "release-class"]))
        );
    }

    #[test]
    fn duplicate_keys_are_conflicts() {
        let problem = Problem::from(StoreError::Duplicate {
            field: "email".to_string(),
        });
        assert_eq!(problem.status, Status::BadRequest);
        assert_eq!(problem.kind(), Some("conflict"));
    }
}
