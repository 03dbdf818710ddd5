//! Entity Repository
//!
//! [`Repository`] composes the [`StorageAdapter`] and a [`LocalStore`] behind one contract:
//! `list`, `upsert`, `delete`, `update_field`. Every call tries the remote path first and
//! degrades to local storage when the adapter is unavailable or reports a failure. The only
//! errors a caller sees are input validation failures and local storage failures that leave
//! nothing persisted; see [`RepositoryError`].
//!
//! There is no retry and no circuit breaker: each call re-attempts the remote path on its own.

mod drink;
mod inventory;
mod record;

pub use record::Record;

use chrono::Utc;
use std::fmt;
use std::sync::Arc;

use crate::adapter::{AdapterError, StorageAdapter};
use crate::model::{Drink, InventoryItem};
use crate::storage::{KeyValueStorage, LocalStore};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Caller-visible repository failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A required input field is missing; nothing was persisted
    Validation(String),
    /// Both the remote and the local write failed
    Storage(String),
}

impl RepositoryError {
    /// Message suitable for showing to the user.
    pub fn message(&self) -> &str {
        match self {
            RepositoryError::Validation(msg) | RepositoryError::Storage(msg) => msg,
        }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::Validation(msg) => write!(f, "Validation error: {}", msg),
            RepositoryError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

pub type DrinkRepository = Repository<Drink>;
pub type InventoryRepository = Repository<InventoryItem>;

/// Remote-first, locally-backed persistence for one entity type.
pub struct Repository<E: Record> {
    adapter: StorageAdapter,
    local: LocalStore<E>,
}

impl<E: Record> fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &E::TABLE)
            .field("adapter", &self.adapter)
            .field("local", &self.local)
            .finish()
    }
}

impl<E: Record> Repository<E> {
    pub fn new(adapter: StorageAdapter, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::with_local(adapter, LocalStore::new(storage))
    }

    pub fn with_local(adapter: StorageAdapter, local: LocalStore<E>) -> Self {
        Self { adapter, local }
    }

    pub fn adapter(&self) -> &StorageAdapter {
        &self.adapter
    }

    pub fn local(&self) -> &LocalStore<E> {
        &self.local
    }

    fn fall_back(&self, op: &'static str, err: &AdapterError) {
        match err {
            AdapterError::Unavailable => {
                log::debug!("{}.{}: remote unavailable, using local storage", E::TABLE, op)
            }
            other => log::warn!(
                "{}.{} failed; falling back to local storage. {}",
                E::TABLE,
                op,
                other
            ),
        }
        #[cfg(feature = "metrics")]
        METRICS.record_fallback(E::TABLE, op);
    }

    fn local_sorted(&self) -> Vec<E> {
        let mut records = self.local.load_all();
        records.sort_by(E::compare);
        records
    }

    /// All records, remote when reachable, otherwise from local storage.
    pub fn list(&self) -> Vec<E> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::repository_span(E::TABLE, "list").entered();

        match self.adapter.fetch_all::<E>() {
            Ok(records) => records,
            Err(e) => {
                self.fall_back("list", &e);
                self.local_sorted()
            }
        }
    }

    /// Create or replace a record and return it as stored, identity included.
    pub fn upsert(&self, input: &E::Input) -> Result<E, RepositoryError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::repository_span(E::TABLE, "upsert").entered();

        E::validate(input).map_err(RepositoryError::Validation)?;
        let record = E::from_input(input, Utc::now());

        match self.adapter.upsert_one(&record) {
            Ok(stored) => Ok(stored),
            Err(e) => {
                self.fall_back("upsert", &e);
                self.local
                    .upsert_one(record)
                    .map_err(|e| RepositoryError::Storage(e.to_string()))
            }
        }
    }

    /// Delete by id. Deleting an absent id is a no-op.
    pub fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::repository_span(E::TABLE, "delete").entered();

        match self.adapter.delete_one::<E>(id) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fall_back("delete", &e);
                self.local
                    .delete_one(id)
                    .map(|_| ())
                    .map_err(|e| RepositoryError::Storage(e.to_string()))
            }
        }
    }

    /// Partial update. Does not refresh any list; callers keep their own view current.
    pub fn update_field(&self, id: &str, field: &E::Field) -> Result<(), RepositoryError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::repository_span(E::TABLE, "update_field").entered();

        let now = Utc::now();
        match self.adapter.update_fields::<E>(id, field, now) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fall_back("update_field", &e);
                match self.local.update_field(id, field, now) {
                    Ok(true) => Ok(()),
                    Ok(false) => {
                        log::debug!("{}: no local record {} to update", E::TABLE, id);
                        Ok(())
                    }
                    Err(e) => Err(RepositoryError::Storage(e.to_string())),
                }
            }
        }
    }
}
