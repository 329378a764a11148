#[macro_use]
extern crate rocket;

use std::sync::Arc;

use error::BackendError;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::{Config, StoreKind};
use crate::coordinator::Coordinator;
use crate::data::store::{MemoryStore, MongoStore, Store};
use crate::error::ConfigurationError;
use crate::route::mount_api;

pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod resp;
pub mod role;
pub mod route;
pub mod util;

pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(l) = log_level {
        let subscriber = FmtSubscriber::builder().with_max_level(l).finish();

        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Unable to set global logger: {}", err);
        };
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let c = match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            c
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            c
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            return Err(other.into());
        }
    };

    let store: Arc<dyn Store> = match c.store {
        StoreKind::Mongodb => {
            tracing::info!("Connecting to MongoDB: {}", c.mongodb_uri);
            let store = MongoStore::connect(&c.mongodb_uri, &c.mongodb_db).await?;
            tracing::info!("Using MongoDB database: {}", c.mongodb_db);
            Arc::new(store)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store, data is lost on shutdown.");
            Arc::new(MemoryStore::new())
        }
    };

    build(c, store)
}

/// Assembles the server around an already opened store.
pub fn build(config: Config, store: Arc<dyn Store>) -> Result<Rocket<Build>, BackendError> {
    let coordinator = Coordinator::new(store, &config);

    tracing::info!("Starting HTTP server...");
    let mut r = rocket::build().manage(config).manage(coordinator);

    tracing::info!("Setting up CORS...");
    let allowed_origins = AllowedOrigins::All;

    let cors = rocket_cors::CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()?;

    r = r.attach(cors);
    r = mount_api(r);

    Ok(r)
}
