//! Document persistence.
//!
//! Every backend offers per-document atomic writes only. Writes that depend on
//! the current content of a document go through [`update_with`], which turns
//! them into compare-and-swap loops on the document `version`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::data::course::Course;
use crate::data::group::Group;
use crate::data::project::Project;
use crate::data::user::User;
use crate::error::StoreError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A document stored in its own collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Serialized field names that must be unique across the collection.
    const UNIQUE: &'static [&'static str] = &[];

    fn id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);

    /// Recomputes derived fields. Called before every save.
    fn normalize(&mut self) {}
}

/// Conjunction of equality tests on top level serialized fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Vec<(&'static str, Value)>);

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    pub fn eq(mut self, field: &'static str, value: impl Serialize) -> Filter {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.push((field, value));
        self
    }

    pub fn fields(&self) -> &[(&'static str, Value)] {
        &self.0
    }

    /// Tests an already serialized document.
    pub fn matches(&self, document: &Value) -> bool {
        self.0.iter().all(|(field, expected)| {
            document.get(*field).unwrap_or(&Value::Null) == expected
        })
    }
}

#[rocket::async_trait]
pub trait Collection<T: Record>: Send + Sync {
    /// Stores a new document with version 0.
    async fn insert(&self, doc: T) -> Result<T, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError>;

    async fn find(&self, filter: Filter) -> Result<Vec<T>, StoreError>;

    /// Replaces the stored document if its version still equals
    /// `doc.version()`. Returns the saved document with the bumped version, or
    /// `None` if the document changed or vanished in the meantime.
    async fn replace(&self, doc: T) -> Result<Option<T>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Deletes the document only if its stored version still equals `version`.
    async fn delete_if(&self, id: Uuid, version: u64) -> Result<bool, StoreError>;

    async fn find_one(&self, filter: Filter) -> Result<Option<T>, StoreError> {
        Ok(self.find(filter).await?.into_iter().next())
    }
}

pub trait Store: Send + Sync {
    fn users(&self) -> &dyn Collection<User>;
    fn courses(&self) -> &dyn Collection<Course>;
    fn groups(&self) -> &dyn Collection<Group>;
    fn projects(&self) -> &dyn Collection<Project>;
}

/// Reads the document, lets `apply` validate and mutate it, and writes it back
/// conditionally on the version it was read at. Lost races are retried from a
/// fresh read, so `apply` always judges the latest committed state.
///
/// Returns `Ok(None)` if the document doesn't exist.
pub async fn update_with<T, E, F>(
    collection: &dyn Collection<T>,
    id: Uuid,
    attempts: u32,
    mut apply: F,
) -> Result<Option<T>, E>
where
    T: Record,
    E: From<StoreError> + Send,
    F: FnMut(&mut T) -> Result<(), E> + Send,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        let mut doc = match collection.get(id).await? {
            Some(it) => it,
            None => return Ok(None),
        };
        apply(&mut doc)?;

        if let Some(saved) = collection.replace(doc).await? {
            return Ok(Some(saved));
        }
        tracing::debug!(
            collection = T::COLLECTION,
            %id,
            attempt,
            "version conflict, retrying write"
        );
    }

    Err(StoreError::Contention { attempts }.into())
}

/// Deletes the document once `check` accepts its latest committed state.
/// Like [`update_with`], a document changed between the check and the delete
/// is re-read and checked again.
///
/// Returns `Ok(None)` if the document doesn't exist.
pub async fn delete_with<T, E, F>(
    collection: &dyn Collection<T>,
    id: Uuid,
    attempts: u32,
    mut check: F,
) -> Result<Option<T>, E>
where
    T: Record,
    E: From<StoreError> + Send,
    F: FnMut(&T) -> Result<(), E> + Send,
{
    let attempts = attempts.max(1);
    for attempt in 1..=attempts {
        let doc = match collection.get(id).await? {
            Some(it) => it,
            None => return Ok(None),
        };
        check(&doc)?;

        if collection.delete_if(id, doc.version()).await? {
            return Ok(Some(doc));
        }
        tracing::debug!(
            collection = T::COLLECTION,
            %id,
            attempt,
            "version conflict, retrying delete"
        );
    }

    Err(StoreError::Contention { attempts }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Counter {
        #[serde(rename = "_id")]
        id: Uuid,
        version: u64,
        name: String,
        hits: u32,
    }

    impl Record for Counter {
        const COLLECTION: &'static str = "counters";
        const UNIQUE: &'static [&'static str] = &["name"];

        fn id(&self) -> Uuid {
            self.id
        }
        fn version(&self) -> u64 {
            self.version
        }
        fn set_version(&mut self, version: u64) {
            self.version = version;
        }
    }

    fn counter(name: &str) -> Counter {
        Counter {
            id: Uuid::new_v4(),
            version: 0,
            name: name.to_string(),
            hits: 0,
        }
    }

    #[test]
    fn filter_matches_serialized_fields() {
        let doc = json!({ "name": "a", "hits": 3, "gone": null });
        assert!(Filter::new().eq("name", "a").eq("hits", 3u32).matches(&doc));
        assert!(Filter::new().eq("missing", Option::<String>::None).matches(&doc));
        assert!(!Filter::new().eq("name", "b").matches(&doc));
    }

    #[rocket::async_test]
    async fn stale_replace_is_refused() {
        let collection = memory::MemoryCollection::<Counter>::default();
        let stored = collection.insert(counter("a")).await.unwrap();

        let mut first = stored.clone();
        first.hits = 1;
        let saved = collection.replace(first).await.unwrap().expect("fresh write");
        assert_eq!(saved.version, 1);

        let mut stale = stored;
        stale.hits = 2;
        assert!(collection.replace(stale).await.unwrap().is_none());
        assert_eq!(collection.get(saved.id).await.unwrap().unwrap().hits, 1);
    }

    #[rocket::async_test]
    async fn unique_fields_are_enforced() {
        let collection = memory::MemoryCollection::<Counter>::default();
        collection.insert(counter("a")).await.unwrap();
        let err = collection.insert(counter("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[rocket::async_test]
    async fn stale_delete_is_refused() {
        let collection = memory::MemoryCollection::<Counter>::default();
        let stored = collection.insert(counter("a")).await.unwrap();

        let mut bumped = stored.clone();
        bumped.hits = 1;
        collection.replace(bumped).await.unwrap().expect("fresh write");

        assert!(!collection.delete_if(stored.id, stored.version).await.unwrap());
        assert!(collection.delete_if(stored.id, stored.version + 1).await.unwrap());
        assert!(collection.get(stored.id).await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn delete_with_checks_the_latest_state() {
        let collection = memory::MemoryCollection::<Counter>::default();
        let id = collection.insert(counter("a")).await.unwrap().id;

        let refused = delete_with::<Counter, StoreError, _>(&collection, id, 3, |doc| {
            if doc.hits > 0 {
                Ok(())
            } else {
                Err(StoreError::Contention { attempts: 0 })
            }
        })
        .await;
        assert!(refused.is_err());
        assert!(collection.get(id).await.unwrap().is_some());

        let deleted = delete_with::<Counter, StoreError, _>(&collection, id, 3, |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(deleted.map(|it| it.id), Some(id));
        let missing = delete_with::<Counter, StoreError, _>(&collection, id, 3, |_| Ok(()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_are_not_lost() {
        let collection = Arc::new(memory::MemoryCollection::<Counter>::default());
        let id = collection.insert(counter("a")).await.unwrap().id;
        let applied = Arc::new(AtomicU32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let collection = collection.clone();
            let applied = applied.clone();
            tasks.push(tokio::spawn(async move {
                update_with::<Counter, StoreError, _>(collection.as_ref(), id, 1000, |doc| {
                    applied.fetch_add(1, Ordering::SeqCst);
                    doc.hits += 1;
                    Ok(())
                })
                .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let doc = collection.get(id).await.unwrap().unwrap();
        assert_eq!(doc.hits, 16);
        assert_eq!(doc.version, 16);
        assert!(applied.load(Ordering::SeqCst) >= 16);
    }
}
