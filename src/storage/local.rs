//! Local fallback store: one JSON array per entity collection.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{KeyValueStorage, StorageError};
use crate::repository::Record;

/// Prefix of every id assigned by the local store.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// `local-<unix millis>-<6 random chars>`.
pub fn generate_local_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{}-{}", LOCAL_ID_PREFIX, Utc::now().timestamp_millis(), suffix)
}

/// Durable array store for one collection of `E`.
///
/// Reads never fail: missing or unreadable data is treated as an empty collection (and
/// logged). Writes report failure to the caller after logging it; they are not retried.
/// Read-modify-write helpers are not atomic across concurrent callers.
pub struct LocalStore<E> {
    storage: Arc<dyn KeyValueStorage>,
    key: &'static str,
    _record: PhantomData<fn() -> E>,
}

impl<E> Clone for LocalStore<E> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            key: self.key,
            _record: PhantomData,
        }
    }
}

impl<E> fmt::Debug for LocalStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore").field("key", &self.key).finish()
    }
}

impl<E: Record> LocalStore<E> {
    /// Store addressed by the record type's own collection key.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_key(storage, E::STORAGE_KEY)
    }

    pub fn with_key(storage: Arc<dyn KeyValueStorage>, key: &'static str) -> Self {
        Self {
            storage,
            key,
            _record: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn load_all(&self) -> Vec<E> {
        let raw = match self.storage.get_item(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read local '{}': {}", self.key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<E>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Discarding unreadable local '{}': {}", self.key, e);
                Vec::new()
            }
        }
    }

    pub fn replace_all(&self, records: &[E]) -> Result<(), StorageError> {
        let result = serde_json::to_string(records)
            .map_err(StorageError::from)
            .and_then(|payload| self.storage.set_item(self.key, &payload));
        if let Err(e) = &result {
            log::warn!("Failed to save local '{}': {}", self.key, e);
        }
        result
    }

    /// Insert or replace by id, assigning a local id when the record has none.
    pub fn upsert_one(&self, mut record: E) -> Result<E, StorageError> {
        if record.id().is_empty() {
            record.set_id(generate_local_id());
        }
        let mut records = self.load_all();
        match records.iter_mut().find(|existing| existing.id() == record.id()) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.replace_all(&records)?;
        Ok(record)
    }

    /// Remove by id. Absent ids leave the collection untouched.
    pub fn delete_one(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.load_all();
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.replace_all(&records)?;
        Ok(true)
    }

    /// Apply a partial update by id. Returns whether a record was found.
    pub fn update_field(
        &self,
        id: &str,
        field: &E::Field,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut records = self.load_all();
        let Some(record) = records.iter_mut().find(|record| record.id() == id) else {
            return Ok(false);
        };
        record.apply_field(field, now);
        self.replace_all(&records)?;
        Ok(true)
    }
}
