use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use super::{Collection, Filter, Record, Store};
use crate::data::course::Course;
use crate::data::group::Group;
use crate::data::project::Project;
use crate::data::user::User;
use crate::error::StoreError;

/// Process local collection. Documents keep their insertion order.
pub struct MemoryCollection<T> {
    docs: Mutex<Vec<T>>,
}

impl<T> Default for MemoryCollection<T> {
    fn default() -> Self {
        MemoryCollection {
            docs: Mutex::new(Vec::new()),
        }
    }
}

fn unique_clash<T: Record>(docs: &[T], candidate: &T) -> Result<Option<&'static str>, StoreError> {
    if T::UNIQUE.is_empty() {
        return Ok(None);
    }

    let candidate = serde_json::to_value(candidate)?;
    for existing in docs {
        let existing = serde_json::to_value(existing)?;
        for field in T::UNIQUE {
            let value = candidate.get(*field).unwrap_or(&Value::Null);
            if !value.is_null() && existing.get(*field) == Some(value) {
                return Ok(Some(*field));
            }
        }
    }
    Ok(None)
}

#[rocket::async_trait]
impl<T: Record> Collection<T> for MemoryCollection<T> {
    async fn insert(&self, mut doc: T) -> Result<T, StoreError> {
        doc.set_version(0);
        doc.normalize();

        let mut docs = self.docs.lock();
        if docs.iter().any(|it| it.id() == doc.id()) {
            return Err(StoreError::Duplicate {
                field: "_id".to_string(),
            });
        }
        if let Some(field) = unique_clash(&docs, &doc)? {
            return Err(StoreError::Duplicate {
                field: field.to_string(),
            });
        }
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        Ok(self.docs.lock().iter().find(|it| it.id() == id).cloned())
    }

    async fn find(&self, filter: Filter) -> Result<Vec<T>, StoreError> {
        let docs = self.docs.lock();
        let mut found = Vec::new();
        for doc in docs.iter() {
            if filter.matches(&serde_json::to_value(doc)?) {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }

    async fn replace(&self, mut doc: T) -> Result<Option<T>, StoreError> {
        let mut docs = self.docs.lock();
        let position = match docs
            .iter()
            .position(|it| it.id() == doc.id() && it.version() == doc.version())
        {
            Some(it) => it,
            None => return Ok(None),
        };

        doc.set_version(doc.version() + 1);
        doc.normalize();

        let others: Vec<T> = docs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, it)| it.clone())
            .collect();
        if let Some(field) = unique_clash(&others, &doc)? {
            return Err(StoreError::Duplicate {
                field: field.to_string(),
            });
        }

        docs[position] = doc.clone();
        Ok(Some(doc))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut docs = self.docs.lock();
        let before = docs.len();
        docs.retain(|it| it.id() != id);
        Ok(docs.len() != before)
    }

    async fn delete_if(&self, id: Uuid, version: u64) -> Result<bool, StoreError> {
        let mut docs = self.docs.lock();
        let before = docs.len();
        docs.retain(|it| it.id() != id || it.version() != version);
        Ok(docs.len() != before)
    }
}

/// Store kept entirely in memory, used by tests and `store: memory`.
#[derive(Default)]
pub struct MemoryStore {
    users: MemoryCollection<User>,
    courses: MemoryCollection<Course>,
    groups: MemoryCollection<Group>,
    projects: MemoryCollection<Project>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl Store for MemoryStore {
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

/// Memory store whose class and project collections can commit a concurrent
/// edit right before the next conditional write, after the caller has read.
#[cfg(test)]
pub(crate) mod interleave {
    use super::*;

    type Edit<T> = Box<dyn FnOnce(&mut T) + Send>;

    pub struct InterleavedCollection<T> {
        inner: MemoryCollection<T>,
        pending: Mutex<Option<Edit<T>>>,
    }

    impl<T> Default for InterleavedCollection<T> {
        fn default() -> Self {
            InterleavedCollection {
                inner: MemoryCollection::default(),
                pending: Mutex::new(None),
            }
        }
    }

    impl<T: Record> InterleavedCollection<T> {
        /// Queues `edit` to be committed ahead of the next `replace` or `delete_if`.
        pub fn before_next_write(&self, edit: impl FnOnce(&mut T) + Send + 'static) {
            *self.pending.lock() = Some(Box::new(edit));
        }

        async fn interleave(&self, id: Uuid) -> Result<(), StoreError> {
            let edit = self.pending.lock().take();
            if let Some(edit) = edit {
                if let Some(mut doc) = self.inner.get(id).await? {
                    edit(&mut doc);
                    self.inner.replace(doc).await?;
                }
            }
            Ok(())
        }
    }

    #[rocket::async_trait]
    impl<T: Record> Collection<T> for InterleavedCollection<T> {
        async fn insert(&self, doc: T) -> Result<T, StoreError> {
            self.inner.insert(doc).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
            self.inner.get(id).await
        }

        async fn find(&self, filter: Filter) -> Result<Vec<T>, StoreError> {
            self.inner.find(filter).await
        }

        async fn replace(&self, doc: T) -> Result<Option<T>, StoreError> {
            self.interleave(doc.id()).await?;
            self.inner.replace(doc).await
        }

        async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }

        async fn delete_if(&self, id: Uuid, version: u64) -> Result<bool, StoreError> {
            self.interleave(id).await?;
            self.inner.delete_if(id, version).await
        }
    }

    #[derive(Default)]
    pub struct InterleavedStore {
        pub users: MemoryCollection<User>,
        pub courses: InterleavedCollection<Course>,
        pub groups: MemoryCollection<Group>,
        pub projects: InterleavedCollection<Project>,
    }

    impl Store for InterleavedStore {
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
}
