use crate::data::course::GroupSizePolicy;
use crate::error::ConfigurationError;
use crate::util;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Mongodb,
    Memory,
}

fn default_store() -> StoreKind {
    match env::var("STORE").as_deref() {
        Ok("memory") => StoreKind::Memory,
        _ => StoreKind::Mongodb,
    }
}

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("groupwork".to_string())
}

fn default_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or("change-me".to_string())
}

#[cfg(debug_assertions)]
fn default_moderator_emails() -> Vec<String> {
    vec![String::from("moderator@localhost")]
}
#[cfg(not(debug_assertions))]
fn default_moderator_emails() -> Vec<String> {
    vec![]
}

fn default_max_students() -> u32 {
    40
}

fn default_course_name() -> String {
    "Software Development Project".to_string()
}

fn default_course_code() -> String {
    "SWP391".to_string()
}

fn default_write_attempts() -> u32 {
    8
}

/// Knobs of the enrollment and group workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentPolicy {
    #[serde(default = "default_max_students")]
    pub default_max_students: u32,
    #[serde(default)]
    pub default_group_size: GroupSizePolicy,
    #[serde(default = "default_course_name")]
    pub default_course_name: String,
    #[serde(default = "default_course_code")]
    pub default_course_code: String,
    /// Promote the earliest-joined member when the leader leaves a non-empty
    /// group. Off keeps the group leaderless.
    #[serde(default)]
    pub leader_succession: bool,
    /// Compare-and-swap attempts per document write before giving up.
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        EnrollmentPolicy {
            default_max_students: default_max_students(),
            default_group_size: GroupSizePolicy::default(),
            default_course_name: default_course_name(),
            default_course_code: default_course_code(),
            leader_succession: false,
            write_attempts: default_write_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_store")]
    pub store: StoreKind,
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_moderator_emails")]
    pub moderator_emails: Vec<String>,

    #[serde(default)]
    pub enrollment: EnrollmentPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            store: default_store(),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            jwt_secret: default_jwt_secret(),
            moderator_emails: default_moderator_emails(),
            enrollment: EnrollmentPolicy::default(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        let file = File::open(&config_file)?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = config_file;

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    pub fn is_moderator_email(&self, email: &str) -> bool {
        self.moderator_emails
            .iter()
            .any(|it| it.eq_ignore_ascii_case(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str(
            "store: memory\njwt_secret: s3cret\nenrollment:\n  leader_succession: true\n",
        )
        .expect("valid yaml");

        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.jwt_secret, "s3cret");
        assert!(config.enrollment.leader_succession);
        assert_eq!(config.enrollment.default_max_students, 40);
        assert_eq!(config.enrollment.default_group_size.max, 5);
        assert_eq!(config.enrollment.write_attempts, 8);
    }

    #[test]
    fn moderator_emails_match_case_insensitively() {
        let mut config = Config::default();
        config.moderator_emails = vec!["Boss@Example.com".to_string()];
        assert!(config.is_moderator_email("boss@example.com"));
        assert!(!config.is_moderator_email("student@example.com"));
    }
}
