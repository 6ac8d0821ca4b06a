use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;
use tracing::trace;
use uuid::Uuid;

use crate::{CoreError, Entity, Repository};

/// In-memory store for one entity kind, kept in insertion order. A single
/// mutex guards the map, so each call is atomic on its own.
pub struct InMemoryRepo<E: Entity> {
    inner: Mutex<IndexMap<Uuid, E>>,
}

impl<E: Entity> InMemoryRepo<E> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IndexMap::new()),
        }
    }

    /// Store pre-built entities as-is. Entities without an id get a fresh one.
    pub fn with_seed(entities: Vec<E>) -> Self {
        let mut map = IndexMap::with_capacity(entities.len());
        for mut entity in entities {
            let id = match entity.id() {
                Some(id) => id,
                None => {
                    let id = fresh_id(&map);
                    entity.set_id(id);
                    id
                }
            };
            map.insert(id, entity);
        }
        Self {
            inner: Mutex::new(map),
        }
    }

    pub fn len(&self) -> Result<usize, CoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, IndexMap<Uuid, E>>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl<E: Entity> Default for InMemoryRepo<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn fresh_id<E>(map: &IndexMap<Uuid, E>) -> Uuid {
    loop {
        let id = Uuid::new_v4();
        if !map.contains_key(&id) {
            return id;
        }
    }
}

impl<E: Entity> Repository<E> for InMemoryRepo<E> {
    fn find_by_id(&self, id: &Uuid) -> Result<Option<E>, CoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<E>, CoreError> {
        let map = self.lock()?;
        Ok(map.values().find(|e| e.email() == email).cloned())
    }

    fn find_all(&self) -> Result<Vec<E>, CoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    fn find_by_name(&self, fragment: &str) -> Result<Vec<E>, CoreError> {
        let map = self.lock()?;
        Ok(map
            .values()
            .filter(|e| e.name().contains(fragment))
            .cloned()
            .collect())
    }

    fn find_names_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError> {
        let map = self.lock()?;
        let mut names: Vec<String> = Vec::new();
        for name in map.values().map(|e| e.name()) {
            if name.starts_with(prefix) && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn create(&self, mut entity: E) -> Result<E, CoreError> {
        let mut map = self.lock()?;
        let id = fresh_id(&map);
        entity.set_id(id);
        map.insert(id, entity.clone());
        trace!(kind = E::KIND, %id, size = map.len(), "stored");
        Ok(entity)
    }

    fn update(&self, entity: E) -> Result<(), CoreError> {
        let Some(id) = entity.id() else {
            return Ok(());
        };
        let mut map = self.lock()?;
        if let Some(slot) = map.get_mut(&id) {
            *slot = entity;
            trace!(kind = E::KIND, %id, "replaced");
        }
        Ok(())
    }

    fn delete_by_id(&self, id: &Uuid) -> Result<(), CoreError> {
        let mut map = self.lock()?;
        if map.shift_remove(id).is_some() {
            trace!(kind = E::KIND, %id, size = map.len(), "removed");
        }
        Ok(())
    }

    fn is_email_existing(&self, email: &str) -> Result<bool, CoreError> {
        let map = self.lock()?;
        Ok(map.values().any(|e| e.email() == email))
    }
}
