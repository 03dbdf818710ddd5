//! Storage Backend Adapter
//!
//! [`RemoteStore`] is the row-oriented collaborator the catalog is backed by (transport and
//! authentication live outside this crate). [`StorageAdapter`] wraps it behind entity-shaped
//! calls and turns every outcome into an [`AdapterResult`]; nothing panics or escapes past
//! this boundary.
//!
//! Availability is decided once, at construction: an adapter built without a client (or
//! from an incomplete [`RemoteConfig`]) stays unavailable for its whole lifetime.

mod memory;

pub use memory::MemoryRemote;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RemoteConfig;
use crate::repository::Record;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// One row as exchanged with the remote store: column name to JSON value.
pub type Row = Map<String, Value>;

/// Sort order requested from `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub ascending: bool,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            ascending: false,
        }
    }
}

/// The `error` half of a remote `{data, error}` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub message: String,
    pub code: Option<String>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Row-oriented table access.
///
/// Calls block the current coroutine until the store answers. Implementations report
/// failures through `Err` only.
pub trait RemoteStore: Send + Sync {
    /// `select(columns).order(order)` over the whole table.
    fn select(&self, table: &str, columns: &[&str], order: OrderBy) -> Result<Vec<Row>, RemoteError>;

    /// Insert or replace by `id`, assigning one when the row has none. Returns the stored row.
    fn upsert(&self, table: &str, row: Row) -> Result<Row, RemoteError>;

    /// `update(patch).eq("id", id)`. Returns the number of rows touched.
    fn update(&self, table: &str, patch: Row, id: &str) -> Result<u64, RemoteError>;

    /// `delete().eq("id", id)`. Returns the number of rows removed.
    fn delete(&self, table: &str, id: &str) -> Result<u64, RemoteError>;
}

/// Adapter failure. Callers treat every variant the same way: fall back to local storage.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterError {
    /// No remote client was configured at startup
    Unavailable,
    /// The remote store answered with an error
    Remote(RemoteError),
    /// A returned row could not be mapped to the domain shape
    Decode(String),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Unavailable => write!(f, "Remote store is not configured"),
            AdapterError::Remote(e) => write!(f, "Remote store error: {}", e),
            AdapterError::Decode(msg) => write!(f, "Row decode error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<RemoteError> for AdapterError {
    fn from(err: RemoteError) -> Self {
        AdapterError::Remote(err)
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Capability-checked handle to the remote store.
#[derive(Clone, Default)]
pub struct StorageAdapter {
    client: Option<Arc<dyn RemoteStore>>,
}

impl fmt::Debug for StorageAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAdapter")
            .field("available", &self.is_available())
            .finish()
    }
}

impl StorageAdapter {
    pub fn new(client: Arc<dyn RemoteStore>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// An adapter with no remote; every call reports [`AdapterError::Unavailable`].
    pub fn unavailable() -> Self {
        Self { client: None }
    }

    /// Build from configuration, calling `connect` only when credentials are present.
    pub fn from_config<F>(config: &RemoteConfig, connect: F) -> Self
    where
        F: FnOnce(&RemoteConfig) -> Arc<dyn RemoteStore>,
    {
        if config.is_configured() {
            Self::new(connect(config))
        } else {
            log::warn!("Remote store configuration is missing; using local storage only.");
            Self::unavailable()
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> AdapterResult<&Arc<dyn RemoteStore>> {
        self.client.as_ref().ok_or(AdapterError::Unavailable)
    }

    /// Time and count one remote call.
    fn observe<T>(
        table: &'static str,
        op: &'static str,
        call: impl FnOnce() -> Result<T, RemoteError>,
    ) -> AdapterResult<T> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::remote_span(table, op).entered();

        let start = Instant::now();
        let result = call();
        let elapsed = start.elapsed();

        #[cfg(feature = "metrics")]
        METRICS.record_remote(table, op, elapsed, result.is_ok());

        if let Err(e) = &result {
            log::debug!("{}.{} failed after {:?}: {}", table, op, elapsed, e);
        }
        result.map_err(AdapterError::from)
    }

    /// Fetch every record of `E`, mapped from wire rows. Rows that cannot be mapped are
    /// logged and skipped; the rest are returned.
    pub fn fetch_all<E: Record>(&self) -> AdapterResult<Vec<E>> {
        let client = self.client()?;
        let rows = Self::observe(E::TABLE, "select", || {
            client.select(E::TABLE, E::COLUMNS, E::ORDER)
        })?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").cloned();
                match E::from_row(row) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        log::warn!("Skipping undecodable row {:?}: {}", id, e);
                        None
                    }
                }
            })
            .collect())
    }

    /// Write `record` and return the stored shape (with the remote-assigned id if it had none).
    pub fn upsert_one<E: Record>(&self, record: &E) -> AdapterResult<E> {
        let client = self.client()?;
        let row = record.to_row();
        let stored = Self::observe(E::TABLE, "upsert", || client.upsert(E::TABLE, row))?;
        E::from_row(stored).map_err(AdapterError::Decode)
    }

    pub fn delete_one<E: Record>(&self, id: &str) -> AdapterResult<()> {
        let client = self.client()?;
        Self::observe(E::TABLE, "delete", || client.delete(E::TABLE, id))?;
        Ok(())
    }

    /// Partial update of the columns behind `field`.
    pub fn update_fields<E: Record>(
        &self,
        id: &str,
        field: &E::Field,
        now: DateTime<Utc>,
    ) -> AdapterResult<()> {
        let client = self.client()?;
        let patch = E::field_patch(field, now);
        Self::observe(E::TABLE, "update", || client.update(E::TABLE, patch, id))?;
        Ok(())
    }
}
