//! In-process backends.
//!
//! Both keep their data behind a mutex, count calls, and can be told to fail
//! a specific call so loader and scan failure paths can be exercised without
//! a network.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{compare_child_keys, RangePage, RelationalBackend, TreeBackend};
use crate::types::UserRecord;

/// Fails the call whose zero-based index equals `fail_at`.
fn check_failure(counter: &AtomicUsize, fail_at: Option<usize>, what: &str) -> Result<()> {
    let call = counter.fetch_add(1, Ordering::SeqCst);
    if fail_at == Some(call) {
        bail!("simulated {what} failure on call {call}");
    }
    Ok(())
}

fn lock_error<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("in-memory backend lock poisoned")
}

/// Tree backend keyed by path, then by child key.
#[derive(Debug, Default)]
pub struct MemoryTree {
    nodes: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    update_calls: AtomicUsize,
    query_calls: AtomicUsize,
    fail_update_at: Option<usize>,
    fail_query_at: Option<usize>,
    released: AtomicUsize,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_update_at(mut self, call: usize) -> Self {
        self.fail_update_at = Some(call);
        self
    }

    pub fn failing_query_at(mut self, call: usize) -> Self {
        self.fail_query_at = Some(call);
        self
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Number of children currently stored under `path`.
    pub fn child_count(&self, path: &str) -> usize {
        self.nodes
            .lock()
            .map(|nodes| nodes.get(path).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn child(&self, path: &str, key: &str) -> Option<Value> {
        let nodes = self.nodes.lock().ok()?;
        nodes.get(path)?.get(key).cloned()
    }
}

#[async_trait]
impl TreeBackend for MemoryTree {
    async fn update_children(&self, path: &str, children: Map<String, Value>) -> Result<()> {
        check_failure(&self.update_calls, self.fail_update_at, "tree update")?;
        let mut nodes = self.nodes.lock().map_err(lock_error)?;
        nodes.entry(path.to_string()).or_default().extend(children);
        Ok(())
    }

    async fn children_after(
        &self,
        path: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, Value)>> {
        check_failure(&self.query_calls, self.fail_query_at, "tree query")?;
        let nodes = self.nodes.lock().map_err(lock_error)?;
        let Some(children) = nodes.get(path) else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(&String, &Value)> = children
            .iter()
            .filter(|(key, _)| {
                after.is_none_or(|cursor| compare_child_keys(key, cursor).is_gt())
            })
            .collect();
        entries.sort_by(|(a, _), (b, _)| compare_child_keys(a, b));

        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Relational backend: one row list per table, each row tagged with an
/// auto-increment id.
#[derive(Debug, Default)]
pub struct MemoryTable {
    tables: Mutex<HashMap<String, Vec<(u64, Value)>>>,
    next_id: AtomicUsize,
    insert_calls: AtomicUsize,
    select_calls: AtomicUsize,
    fail_insert_at: Option<usize>,
    fail_select_at: Option<usize>,
    max_rows: Option<usize>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert_at(mut self, call: usize) -> Self {
        self.fail_insert_at = Some(call);
        self
    }

    pub fn failing_select_at(mut self, call: usize) -> Self {
        self.fail_select_at = Some(call);
        self
    }

    /// Caps the rows returned by a single select, like PostgREST's `max-rows`.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Ids assigned to the rows of `table`, in insertion order.
    pub fn row_ids(&self, table: &str) -> Vec<u64> {
        self.tables
            .lock()
            .map(|tables| {
                tables
                    .get(table)
                    .map(|rows| rows.iter().map(|(id, _)| *id).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn project(row: &Value, columns: &str) -> Value {
        if columns == "*" {
            return row.clone();
        }
        let projected: Map<String, Value> = columns
            .split(',')
            .map(str::trim)
            .filter_map(|column| row.get(column).map(|v| (column.to_string(), v.clone())))
            .collect();
        Value::Object(projected)
    }

    fn select(&self, table: &str, columns: &str, from: usize, len: usize) -> Result<RangePage> {
        check_failure(&self.select_calls, self.fail_select_at, "table select")?;
        let tables = self.tables.lock().map_err(lock_error)?;
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or_default();
        let len = self.max_rows.map_or(len, |max| len.min(max));

        Ok(RangePage {
            rows: rows
                .iter()
                .skip(from)
                .take(len)
                .map(|(_, row)| Self::project(row, columns))
                .collect(),
            total: Some(rows.len()),
        })
    }
}

#[async_trait]
impl RelationalBackend for MemoryTable {
    async fn insert(&self, table: &str, rows: &[UserRecord]) -> Result<()> {
        check_failure(&self.insert_calls, self.fail_insert_at, "table insert")?;
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables = self.tables.lock().map_err(lock_error)?;
        let stored = tables.entry(table.to_string()).or_default();
        for value in values {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64 + 1;
            stored.push((id, value));
        }
        Ok(())
    }

    async fn select_range(
        &self,
        table: &str,
        columns: &str,
        from: usize,
        to: usize,
    ) -> Result<RangePage> {
        if to < from {
            bail!("invalid range {from}-{to}");
        }
        self.select(table, columns, from, to - from + 1)
    }

    async fn select_limit(&self, table: &str, columns: &str, limit: usize) -> Result<Vec<Value>> {
        Ok(self.select(table, columns, 0, limit)?.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryTable, MemoryTree};
    use crate::backends::{RelationalBackend, TreeBackend};
    use crate::generate::generate_users;
    use serde_json::{json, Map, Value};

    fn children(keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .map(|key| (key.to_string(), json!({ "name": key })))
            .collect()
    }

    #[tokio::test]
    async fn tree_pages_by_key_with_exclusive_cursor() {
        let tree = MemoryTree::new();
        tree.update_children("users", children(&["10", "2", "1", "0"]))
            .await
            .unwrap();

        let first = tree.children_after("users", None, 2).await.unwrap();
        let keys: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["0", "1"]);

        let rest = tree.children_after("users", Some("1"), 10).await.unwrap();
        let keys: Vec<&str> = rest.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["2", "10"]);
        assert_eq!(tree.query_calls(), 2);
    }

    #[tokio::test]
    async fn tree_update_overwrites_existing_keys() {
        let tree = MemoryTree::new();
        tree.update_children("users", children(&["0", "1"])).await.unwrap();
        tree.update_children("users", children(&["1", "2"])).await.unwrap();
        assert_eq!(tree.child_count("users"), 3);
    }

    #[tokio::test]
    async fn table_reports_total_and_caps_rows() {
        let table = MemoryTable::new().with_max_rows(3);
        table.insert("users", &generate_users(5)).await.unwrap();

        let page = table.select_range("users", "name", 0, 9).await.unwrap();
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.total, Some(5));
        assert_eq!(page.rows[0], json!({ "name": "User1 Lastname1" }));
        assert_eq!(table.row_ids("users"), [1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn injected_failure_hits_only_the_chosen_call() {
        let table = MemoryTable::new().failing_insert_at(1);
        let users = generate_users(2);
        assert!(table.insert("users", &users).await.is_ok());
        assert!(table.insert("users", &users).await.is_err());
        assert!(table.insert("users", &users).await.is_ok());
        assert_eq!(table.row_count("users"), 4);
    }
}
