use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Debug;

use crate::adapter::{OrderBy, Row};

/// An entity the repository can persist remotely and locally.
///
/// Implementations own the mapping between the wire row (remote column names, nullable
/// columns) and the domain shape, so wire-shape drift is handled in exactly one place.
/// The serde representation of `Self` is the local storage format.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Caller-supplied fields for `upsert`.
    type Input: Debug + Send + Sync;
    /// Partial updates accepted by `update_field`.
    type Field: Clone + Debug + Send + Sync + 'static;

    /// Remote table name.
    const TABLE: &'static str;
    /// Columns requested by `list`.
    const COLUMNS: &'static [&'static str];
    /// Order requested by `list`.
    const ORDER: OrderBy;
    /// Key of the local fallback collection.
    const STORAGE_KEY: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Check required input fields. The error is a user-facing message.
    fn validate(input: &Self::Input) -> Result<(), String>;

    /// Build the record to store. The id is the input's id, or empty when none was supplied.
    fn from_input(input: &Self::Input, now: DateTime<Utc>) -> Self;

    /// Domain shape to wire row. An empty id is omitted so the remote assigns one.
    fn to_row(&self) -> Row;

    /// Wire row to domain shape, applying defaults for missing optional columns.
    fn from_row(row: Row) -> Result<Self, String>;

    /// Columns to send for a partial update.
    fn field_patch(field: &Self::Field, now: DateTime<Utc>) -> Row;

    /// Apply a partial update to a locally stored record.
    fn apply_field(&mut self, field: &Self::Field, now: DateTime<Utc>);

    /// Local ordering, matching [`Record::ORDER`].
    fn compare(a: &Self, b: &Self) -> Ordering;
}
