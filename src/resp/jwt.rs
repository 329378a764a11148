use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, Status};
use rocket::outcome::Outcome::{Error, Success};
use rocket::request::{self, FromRequest, Request};
use rocket::time::OffsetDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::util::date_time_as_unix_seconds;
use crate::config::Config;
use crate::resp::problem::{problems, Problem};
use crate::role::{Caller, Role};

pub static AUTH_COOKIE_NAME: &str = "jwt_auth";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub user: Uuid,
    pub role: Role,
}

impl UserRoleToken {
    pub fn new(user: Uuid, role: Role) -> UserRoleToken {
        let now = Utc::now();
        UserRoleToken {
            iat: now,
            exp: now + Duration::weeks(1),
            user,
            role,
        }
    }

    pub fn caller(&self) -> Caller {
        Caller::new(self.user, self.role)
    }

    pub fn encode_jwt(&self, secret: impl AsRef<[u8]>) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, &self, &EncodingKey::from_secret(secret.as_ref()))
    }

    pub fn decode_jwt(
        token: &str,
        secret: impl AsRef<[u8]>,
    ) -> Result<UserRoleToken, jsonwebtoken::errors::Error> {
        decode::<UserRoleToken>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
    }

    pub fn cookie(&self, secret: impl AsRef<[u8]>) -> Result<Cookie<'static>, jsonwebtoken::errors::Error> {
        Ok(Cookie::build((AUTH_COOKIE_NAME, self.encode_jwt(secret)?))
            .secure(true)
            .expires(OffsetDateTime::from_unix_timestamp(self.exp.timestamp()).ok())
            .path("/")
            .http_only(true)
            .build())
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    problems::unauthorized().detail(detail).clone()
}

/// Reads the raw token from the auth cookie, falling back to a bearer
/// `Authorization` header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_COOKIE_NAME) {
        tracing::trace!("found jwt auth cookie");
        return Some(cookie.value().to_owned());
    }

    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
}

pub fn extract_claims(req: &Request<'_>, secret: impl AsRef<[u8]>) -> Result<UserRoleToken, Problem> {
    let token = raw_token(req).ok_or_else(|| auth_problem("No JWT auth cookie or bearer token."))?;

    match UserRoleToken::decode_jwt(&token, secret) {
        Ok(it) => {
            tracing::debug!("decoded user roles token for user: {}", it.user);
            Ok(it)
        }
        Err(e) => {
            tracing::debug!("rejected jwt: {}", e);
            Err(Problem::from(e))
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserRoleToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(it) => it,
            None => {
                tracing::error!("configuration isn't managed, unable to verify tokens");
                return Error((Status::InternalServerError, problems::internal()));
            }
        };

        match extract_claims(req, &config.jwt_secret) {
            Ok(claims) => Success(claims),
            Err(e) => Error((Status::Unauthorized, e)),
        }
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct JWTAuth;

    impl From<JWTAuth> for SecurityScheme {
        fn from(_: JWTAuth) -> SecurityScheme {
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            )
        }
    }

    impl utoipa::Modify for JWTAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme("jwt", *self)
            }
        }
    }
}
