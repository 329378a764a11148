use std::marker::PhantomData;

use bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use super::{Collection, Filter, Record, Store};
use crate::data::course::Course;
use crate::data::group::Group;
use crate::data::project::Project;
use crate::data::user::User;
use crate::error::StoreError;

const DUPLICATE_KEY: i32 = 11000;

pub mod filter {
    use super::*;

    #[inline]
    pub fn by_id(id: Uuid) -> Result<Document, StoreError> {
        Ok(doc! { "_id": bson::to_bson(&id)? })
    }

    #[inline]
    pub fn by_id_and_version(id: Uuid, version: u64) -> Result<Document, StoreError> {
        Ok(doc! {
            "_id": bson::to_bson(&id)?,
            "version": version as i64,
        })
    }

    pub fn from_filter(filter: &Filter) -> Result<Document, StoreError> {
        let mut document = Document::new();
        for (field, value) in filter.fields() {
            document.insert(*field, bson::to_bson(value)?);
        }
        Ok(document)
    }
}

fn map_write_error(e: mongodb::error::Error) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(write)) = e.kind.as_ref() {
        if write.code == DUPLICATE_KEY {
            return StoreError::Duplicate {
                field: "unique key".to_string(),
            };
        }
    }
    StoreError::Database(e)
}

/// Typed view over an untyped MongoDB collection.
pub struct MongoCollection<T> {
    inner: mongodb::Collection<Document>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> MongoCollection<T> {
    pub async fn open(db: &Database) -> Result<Self, StoreError> {
        let inner = db.collection::<Document>(T::COLLECTION);

        for field in T::UNIQUE {
            tracing::debug!("Ensuring unique index on {}.{}", T::COLLECTION, field);
            let mut keys = Document::new();
            keys.insert(*field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            inner.create_index(index, None).await?;
        }

        Ok(MongoCollection {
            inner,
            _marker: PhantomData,
        })
    }

    fn to_document(doc: &T) -> Result<Document, StoreError> {
        Ok(bson::to_document(doc)?)
    }
}

#[rocket::async_trait]
impl<T: Record> Collection<T> for MongoCollection<T> {
    async fn insert(&self, mut doc: T) -> Result<T, StoreError> {
        doc.set_version(0);
        doc.normalize();

        self.inner
            .insert_one(Self::to_document(&doc)?, None)
            .await
            .map_err(map_write_error)?;

        Ok(doc)
    }

    async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let document = self.inner.find_one(filter::by_id(id)?, None).await?;

        match document {
            Some(doc) => Ok(Some(bson::from_bson(Bson::Document(doc))?)),
            None => Ok(None),
        }
    }

    async fn find(&self, filter: Filter) -> Result<Vec<T>, StoreError> {
        let mut cursor = self
            .inner
            .find(filter::from_filter(&filter)?, None)
            .await?;

        let mut found = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            match bson::from_bson::<T>(Bson::Document(document)) {
                Ok(it) => found.push(it),
                Err(e) => {
                    tracing::warn!("Unable to deserialize {} document: {}", T::COLLECTION, e)
                }
            }
        }

        Ok(found)
    }

    async fn replace(&self, mut doc: T) -> Result<Option<T>, StoreError> {
        let expected = doc.version();
        doc.set_version(expected + 1);
        doc.normalize();

        let result = self
            .inner
            .replace_one(
                filter::by_id_and_version(doc.id(), expected)?,
                Self::to_document(&doc)?,
                None,
            )
            .await
            .map_err(map_write_error)?;

        Ok((result.matched_count == 1).then_some(doc))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = self.inner.delete_one(filter::by_id(id)?, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn delete_if(&self, id: Uuid, version: u64) -> Result<bool, StoreError> {
        let result = self
            .inner
            .delete_one(filter::by_id_and_version(id, version)?, None)
            .await?;
        Ok(result.deleted_count == 1)
    }
}

pub struct MongoStore {
    users: MongoCollection<User>,
    courses: MongoCollection<Course>,
    groups: MongoCollection<Group>,
    projects: MongoCollection<Project>,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<MongoStore, StoreError> {
        tracing::info!("Connecting to MongoDB: {}", uri);
        let client = Client::with_uri_str(uri).await?;

        tracing::info!("Using MongoDB database: {}", db_name);
        let db = client.database(db_name);
        db.list_collection_names(None).await?;

        MongoStore::open(&db).await
    }

    pub async fn open(db: &Database) -> Result<MongoStore, StoreError> {
        Ok(MongoStore {
            users: MongoCollection::open(db).await?,
            courses: MongoCollection::open(db).await?,
            groups: MongoCollection::open(db).await?,
            projects: MongoCollection::open(db).await?,
        })
    }
}

impl Store for MongoStore {
    fn users(&self) -> &dyn Collection<User> {
        &self.users
    }

    fn courses(&self) -> &dyn Collection<Course> {
        &self.courses
    }

    fn groups(&self) -> &dyn Collection<Group> {
        &self.groups
    }

    fn projects(&self) -> &dyn Collection<Project> {
        &self.projects
    }
}
