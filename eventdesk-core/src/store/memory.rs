//! In-process table store.
//!
//! Behaves like the hosted API for everything eventdesk relies on
//! (record IDs, autonumber fields, the batch-delete size limit) and can
//! be told to fail specific operations.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::constants::BATCH_DELETE_LIMIT;
use crate::error::{EventDeskError, EventDeskResult};
use crate::store::{Fields, Filter, Record, TableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Query,
    Create,
    Update,
    Delete,
    BatchDelete,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Record>>,
    next_record: u64,
    autonumber: HashMap<String, (String, i64)>,
    failing: HashSet<(String, StoreOp)>,
    failing_creates: Vec<(String, String, Value)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `field` an increasing integer on every create in `table`.
    pub fn with_autonumber(self, table: &str, field: &str) -> Self {
        self.lock()
            .autonumber
            .insert(table.to_string(), (field.to_string(), 0));
        self
    }

    /// Make every `op` on `table` fail as if the network were down.
    pub fn fail(&self, table: &str, op: StoreOp) {
        self.lock().failing.insert((table.to_string(), op));
    }

    /// Make creates in `table` fail when `field` equals `value`.
    pub fn fail_create_matching(&self, table: &str, field: &str, value: impl Into<Value>) {
        self.lock()
            .failing_creates
            .push((table.to_string(), field.to_string(), value.into()));
    }

    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.failing.clear();
        inner.failing_creates.clear();
    }

    /// Insert a row without going through the async API.
    pub fn seed(&self, table: &str, fields: Fields) -> Record {
        self.lock().insert(table, fields)
    }

    /// Snapshot of every row in `table`.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn check(&self, table: &str, op: StoreOp) -> EventDeskResult<()> {
        if self.failing.contains(&(table.to_string(), op)) {
            return Err(EventDeskError::RemoteUnavailable(format!(
                "{op:?} on '{table}' failed"
            )));
        }
        Ok(())
    }

    fn insert(&mut self, table: &str, mut fields: Fields) -> Record {
        self.next_record += 1;
        let id = format!("rec{:014}", self.next_record);

        if let Some((field, counter)) = self.autonumber.get_mut(table) {
            *counter += 1;
            fields.insert(field.clone(), Value::from(*counter));
        }

        let record = Record { id, fields };
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    fn position(&self, table: &str, record_id: &str) -> EventDeskResult<usize> {
        self.tables
            .get(table)
            .and_then(|rows| rows.iter().position(|r| r.id == record_id))
            .ok_or_else(|| not_found(table, record_id))
    }
}

fn not_found(table: &str, record_id: &str) -> EventDeskError {
    EventDeskError::Remote {
        status: 404,
        message: format!("Record {record_id} not found in '{table}'"),
    }
}

impl TableStore for MemoryStore {
    async fn query_all(&self, table: &str, filter: &Filter) -> EventDeskResult<Vec<Record>> {
        let inner = self.lock();
        inner.check(table, StoreOp::Query)?;

        Ok(inner
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| filter.matches(&r.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, table: &str, fields: Fields) -> EventDeskResult<Record> {
        let mut inner = self.lock();
        inner.check(table, StoreOp::Create)?;

        let rejected = inner.failing_creates.iter().any(|(t, field, value)| {
            t == table && fields.get(field).is_some_and(|v| v == value)
        });
        if rejected {
            return Err(EventDeskError::Remote {
                status: 422,
                message: "INVALID_VALUE_FOR_COLUMN".into(),
            });
        }

        Ok(inner.insert(table, fields))
    }

    async fn update(&self, table: &str, record_id: &str, fields: Fields) -> EventDeskResult<Record> {
        let mut inner = self.lock();
        inner.check(table, StoreOp::Update)?;

        let index = inner.position(table, record_id)?;
        let rows = inner.tables.entry(table.to_string()).or_default();
        let record = &mut rows[index];
        record.fields.extend(fields);
        Ok(record.clone())
    }

    async fn delete(&self, table: &str, record_id: &str) -> EventDeskResult<()> {
        let mut inner = self.lock();
        inner.check(table, StoreOp::Delete)?;

        let index = inner.position(table, record_id)?;
        inner.tables.entry(table.to_string()).or_default().remove(index);
        Ok(())
    }

    async fn batch_delete(&self, table: &str, record_ids: &[String]) -> EventDeskResult<()> {
        let mut inner = self.lock();
        inner.check(table, StoreOp::BatchDelete)?;

        if record_ids.len() > BATCH_DELETE_LIMIT {
            return Err(EventDeskError::Remote {
                status: 422,
                message: format!("Cannot delete more than {BATCH_DELETE_LIMIT} records at once"),
            });
        }

        for id in record_ids {
            inner.position(table, id)?;
        }

        if let Some(rows) = inner.tables.get_mut(table) {
            rows.retain(|r| !record_ids.contains(&r.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_query_update_delete() {
        let store = MemoryStore::new();

        let a = store
            .create("t", fields(json!({ "event_id": 1, "name": "a" })))
            .await
            .unwrap();
        store
            .create("t", fields(json!({ "event_id": 2, "name": "b" })))
            .await
            .unwrap();

        let rows = store.query_all("t", &Filter::eq("event_id", 1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].str_field("name"), Some("a"));

        let updated = store
            .update("t", &a.id, fields(json!({ "name": "renamed" })))
            .await
            .unwrap();
        assert_eq!(updated.str_field("name"), Some("renamed"));
        assert_eq!(updated.i64_field("event_id"), Some(1));

        store.delete("t", &a.id).await.unwrap();
        assert_eq!(store.rows("t").len(), 1);
        assert!(store.delete("t", &a.id).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_delete_limit() {
        let store = MemoryStore::new();
        let ids: Vec<String> = (0..11)
            .map(|i| store.seed("t", fields(json!({ "n": i }))).id)
            .collect();

        assert!(store.batch_delete("t", &ids).await.is_err());
        assert_eq!(store.rows("t").len(), 11);

        store.batch_delete("t", &ids[..10]).await.unwrap();
        assert_eq!(store.rows("t").len(), 1);
    }

    #[tokio::test]
    async fn test_autonumber_and_failures() {
        let store = MemoryStore::new().with_autonumber("events", "ID");

        let first = store.create("events", Fields::new()).await.unwrap();
        let second = store.create("events", Fields::new()).await.unwrap();
        assert_eq!(first.i64_field("ID"), Some(1));
        assert_eq!(second.i64_field("ID"), Some(2));

        store.fail("events", StoreOp::Query);
        assert!(matches!(
            store.query_all("events", &Filter::All).await,
            Err(EventDeskError::RemoteUnavailable(_))
        ));

        store.clear_failures();
        assert_eq!(store.query_all("events", &Filter::All).await.unwrap().len(), 2);
    }
}
