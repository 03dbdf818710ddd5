//! In-process [`RemoteStore`] used by tests and offline demos.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::RwLock;

use super::{OrderBy, RemoteError, RemoteStore, Row};

/// Table-per-`Vec` remote store with switchable failure injection.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(AtomicOrdering::SeqCst)
    }

    /// Number of calls received, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Raw rows currently stored in `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        let tables = match self.tables.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables.get(table).cloned().unwrap_or_default()
    }

    /// Insert rows as-is, bypassing id assignment.
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    fn begin(&self, op: &str) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.is_failing() {
            Err(RemoteError::new(format!("simulated outage during {op}")).with_code("503"))
        } else {
            Ok(())
        }
    }

    fn write_tables(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Row>>> {
        match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // Nulls sort first ascending, as in Postgres `NULLS FIRST`.
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl RemoteStore for MemoryRemote {
    fn select(&self, table: &str, columns: &[&str], order: OrderBy) -> Result<Vec<Row>, RemoteError> {
        self.begin("select")?;
        let mut rows: Vec<Row> = self
            .rows(table)
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .filter(|(column, _)| columns.contains(&column.as_str()))
                    .collect()
            })
            .collect();

        rows.sort_by(|a, b| {
            let ord = compare_values(a.get(order.column), b.get(order.column));
            if order.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        Ok(rows)
    }

    fn upsert(&self, table: &str, mut row: Row) -> Result<Row, RemoteError> {
        self.begin("upsert")?;
        let id = match row_id(&row) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        row.insert("id".to_string(), Value::String(id.clone()));

        let mut tables = self.write_tables();
        let rows = tables.entry(table.to_string()).or_default();
        match rows.iter_mut().find(|existing| row_id(existing) == Some(id.as_str())) {
            Some(existing) => *existing = row.clone(),
            None => rows.push(row.clone()),
        }
        Ok(row)
    }

    fn update(&self, table: &str, patch: Row, id: &str) -> Result<u64, RemoteError> {
        self.begin("update")?;
        let mut tables = self.write_tables();
        let mut touched = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| row_id(row) == Some(id)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn delete(&self, table: &str, id: &str) -> Result<u64, RemoteError> {
        self.begin("delete")?;
        let mut tables = self.write_tables();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| row_id(row) != Some(id));
        Ok((before - rows.len()) as u64)
    }
}
