//! Full-collection scans used by the benchmark endpoints.
//!
//! Two strategies share the [`FullScan`] interface:
//! - [`OffsetPagedScan`] pages a relational table by row offset and stops once
//!   the accumulated rows reach the exact total reported with each page
//! - [`KeyCursorScan`] pages a tree node by key, using the last key seen as an
//!   exclusive cursor, and stops on the first short page
//!
//! A key-cursor scan over a collection whose size is an exact multiple of the
//! page size issues one extra request, which comes back empty and ends the
//! scan. The reported count is exact either way.
//!
//! Page sizes are [`NonZeroUsize`]: an empty page request could never make
//! progress.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use crate::backends::{RelationalBackend, TreeBackend};
use crate::constants::{NAME_COLUMN, SCAN_PAGE_SIZE, USERS_PATH, USERS_TABLE};
use crate::types::ScanReport;

#[async_trait]
pub trait FullScan: Send + Sync {
    /// Backend name used in log lines.
    fn label(&self) -> &str;

    /// Fetches the name of every record in the collection, page by page.
    async fn fetch_names(&self) -> Result<Vec<String>>;
}

/// Runs `scan` to completion and reports the record count and elapsed
/// wall-clock milliseconds.
pub async fn timed_scan(scan: &dyn FullScan) -> Result<ScanReport> {
    let start = Instant::now();
    let names = scan.fetch_names().await?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    info!("{} fetch time: {}ms", scan.label(), elapsed_ms);
    info!("{} fetched data: {} records", scan.label(), names.len());

    Ok(ScanReport {
        count: names.len(),
        time: elapsed_ms,
    })
}

/// Rows without the field still count; they contribute an empty name.
fn field_text(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Offset paging over a relational table.
pub struct OffsetPagedScan {
    label: String,
    backend: Arc<dyn RelationalBackend>,
    table: String,
    column: String,
    page_size: NonZeroUsize,
}

impl OffsetPagedScan {
    pub fn new(
        label: &str,
        backend: Arc<dyn RelationalBackend>,
        table: &str,
        column: &str,
        page_size: NonZeroUsize,
    ) -> Self {
        Self {
            label: label.to_string(),
            backend,
            table: table.to_string(),
            column: column.to_string(),
            page_size,
        }
    }

    /// The `users.name` scan served at `/api/supabase`.
    pub fn supabase(backend: Arc<dyn RelationalBackend>) -> Self {
        Self::new("Supabase", backend, USERS_TABLE, NAME_COLUMN, SCAN_PAGE_SIZE)
    }

    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl FullScan for OffsetPagedScan {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        loop {
            // Advance by rows actually received: the backend may cap a page
            // below the requested size.
            let from = names.len();
            let page = self
                .backend
                .select_range(&self.table, &self.column, from, from + self.page_size.get() - 1)
                .await?;
            let total = page.total.ok_or_else(|| {
                anyhow!("{} did not report an exact row count for {}", self.label, self.table)
            })?;

            let received = page.rows.len();
            names.extend(page.rows.iter().map(|row| field_text(row, &self.column)));
            info!("{}: Fetched {} of {} records", self.label, names.len(), total);

            if names.len() >= total || received == 0 {
                break;
            }
        }

        Ok(names)
    }
}

/// Key-cursor paging over the children of a tree node.
pub struct KeyCursorScan {
    label: String,
    backend: Arc<dyn TreeBackend>,
    path: String,
    field: String,
    page_size: NonZeroUsize,
}

impl KeyCursorScan {
    pub fn new(
        label: &str,
        backend: Arc<dyn TreeBackend>,
        path: &str,
        field: &str,
        page_size: NonZeroUsize,
    ) -> Self {
        Self {
            label: label.to_string(),
            backend,
            path: path.to_string(),
            field: field.to_string(),
            page_size,
        }
    }

    /// The `users/*/name` scan served at `/api/firebase`.
    pub fn firebase(backend: Arc<dyn TreeBackend>) -> Self {
        Self::new("Firebase", backend, USERS_PATH, NAME_COLUMN, SCAN_PAGE_SIZE)
    }

    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl FullScan for KeyCursorScan {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut last_key: Option<String> = None;

        loop {
            let page = self
                .backend
                .children_after(&self.path, last_key.as_deref(), self.page_size.get())
                .await?;

            let received = page.len();
            for (key, value) in page {
                names.push(field_text(&value, &self.field));
                last_key = Some(key);
            }
            info!("{}: Fetched {} records", self.label, names.len());

            if received < self.page_size.get() {
                break;
            }
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::{field_text, timed_scan, FullScan, KeyCursorScan, OffsetPagedScan};
    use crate::backends::memory::{MemoryTable, MemoryTree};
    use crate::backends::{RangePage, RelationalBackend};
    use crate::generate::generate_users;
    use crate::loader::load_tree;
    use crate::types::UserRecord;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    /// Reports a total but never returns rows.
    struct StalledTable;

    #[async_trait]
    impl RelationalBackend for StalledTable {
        async fn insert(&self, _: &str, _: &[UserRecord]) -> Result<()> {
            Ok(())
        }

        async fn select_range(&self, _: &str, _: &str, _: usize, _: usize) -> Result<RangePage> {
            Ok(RangePage {
                rows: Vec::new(),
                total: Some(50),
            })
        }

        async fn select_limit(&self, _: &str, _: &str, _: usize) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn missing_fields_read_as_empty() {
        assert_eq!(field_text(&json!({ "name": "a" }), "name"), "a");
        assert_eq!(field_text(&json!({}), "name"), "");
        assert_eq!(field_text(&json!({ "name": 5 }), "name"), "");
    }

    #[tokio::test]
    async fn empty_collections_scan_in_one_request() {
        let table = Arc::new(MemoryTable::new());
        let report = timed_scan(&OffsetPagedScan::supabase(table.clone()))
            .await
            .unwrap();
        assert_eq!(report.count, 0);
        assert_eq!(table.select_calls(), 1);

        let tree = Arc::new(MemoryTree::new());
        let report = timed_scan(&KeyCursorScan::firebase(tree.clone())).await.unwrap();
        assert_eq!(report.count, 0);
        assert_eq!(tree.query_calls(), 1);
    }

    #[tokio::test]
    async fn offset_scan_stops_when_rows_run_out_before_the_total() {
        let scan = OffsetPagedScan::supabase(Arc::new(StalledTable));
        assert_eq!(scan.fetch_names().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn single_record_pages_still_terminate() {
        let one = NonZeroUsize::MIN;

        let table = Arc::new(MemoryTable::new());
        table.insert("users", &generate_users(3)).await.unwrap();
        let scan = OffsetPagedScan::supabase(table.clone()).with_page_size(one);
        assert_eq!(scan.fetch_names().await.unwrap().len(), 3);
        assert_eq!(table.select_calls(), 3);

        let tree = Arc::new(MemoryTree::new());
        load_tree(tree.as_ref(), "users", &generate_users(3), 10).await.unwrap();
        let scan = KeyCursorScan::firebase(tree.clone()).with_page_size(one);
        assert_eq!(scan.fetch_names().await.unwrap().len(), 3);
        // Three full pages, then the empty one that ends the scan.
        assert_eq!(tree.query_calls(), 4);
    }

    #[test]
    fn labels_name_the_backend() {
        let table = OffsetPagedScan::supabase(Arc::new(MemoryTable::new()));
        let tree = KeyCursorScan::firebase(Arc::new(MemoryTree::new()));
        assert_eq!(table.label(), "Supabase");
        assert_eq!(tree.label(), "Firebase");
    }
}
