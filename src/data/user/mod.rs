use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::store::Record;
use crate::role::Role;
use crate::util::base64_engine;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "users";

fn true_bool() -> bool {
    true
}

/// Salted SHA-256 digest, `salt$digest` in URL safe base64.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>) -> PasswordHash {
        let salt: [u8; 16] = rand::random();
        PasswordHash::with_salt(&salt, password)
    }

    fn with_salt(salt: &[u8], password: impl AsRef<str>) -> PasswordHash {
        let mut sha = Sha256::new();
        sha.update(salt);
        sha.update(password.as_ref().as_bytes());

        let engine = base64_engine();
        PasswordHash(format!(
            "{}${}",
            engine.encode(salt),
            engine.encode(sha.finalize())
        ))
    }

    pub fn verify(&self, password: impl AsRef<str>) -> bool {
        let salt = match self.0.split_once('$') {
            Some((salt, _)) => salt,
            None => return false,
        };
        match base64_engine().decode(salt) {
            Ok(salt) => PasswordHash::with_salt(&salt, password) == *self,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub version: u64,

    pub student_id: String,
    pub email: String,
    pub pw_hash: PasswordHash,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub cohort: Option<String>,

    /// Class code of the one class the student currently attends.
    #[serde(default)]
    pub current_class: Option<String>,
    #[serde(default)]
    pub enrolled_classes: Vec<String>,
    #[serde(default)]
    pub current_group: Option<Uuid>,
    #[serde(default)]
    pub group_invites: Vec<Uuid>,

    #[serde(default = "true_bool")]
    pub active: bool,
}

impl Record for User {
    const COLLECTION: &'static str = USER_COLLECTION_NAME;
    const UNIQUE: &'static [&'static str] = &["student_id", "email"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn normalize(&mut self) {
        if let Some(class) = &self.current_class {
            if !self.enrolled_classes.contains(class) {
                self.enrolled_classes.push(class.clone());
            }
        }
    }
}

impl User {
    pub fn new(
        student_id: impl ToString,
        email: impl ToString,
        name: impl ToString,
        password: impl AsRef<str>,
        role: Role,
    ) -> User {
        let student_id = student_id.to_string().to_ascii_uppercase();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, student_id.as_bytes());
        tracing::info!("Creating a new user with UUID: {}", id);

        User {
            id,
            version: 0,
            student_id,
            email: email.to_string().to_ascii_lowercase(),
            pw_hash: PasswordHash::new(password),
            name: name.to_string(),
            role,
            cohort: None,
            current_class: None,
            enrolled_classes: vec![],
            current_group: None,
            group_invites: vec![],
            active: true,
        }
    }

    pub fn is_invited_to(&self, group: Uuid) -> bool {
        self.group_invites.contains(&group)
    }
}

/// Public view of a user, without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub student_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub cohort: Option<String>,
    pub current_class: Option<String>,
    pub enrolled_classes: Vec<String>,
    pub current_group: Option<Uuid>,
    pub group_invites: Vec<Uuid>,
    pub active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            student_id: user.student_id,
            email: user.email,
            name: user.name,
            role: user.role,
            cohort: user.cohort,
            current_class: user.current_class,
            enrolled_classes: user.enrolled_classes,
            current_group: user.current_group,
            group_invites: user.group_invites,
            active: user.active,
        }
    }
}

/// Minimal reference used when populating other entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub student_id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            student_id: user.student_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}
