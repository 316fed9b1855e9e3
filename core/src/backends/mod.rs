//! Backend traits and their implementations.
//!
//! - [`firebase::FirebaseClient`]: tree-structured realtime database over REST
//! - [`supabase::SupabaseClient`]: relational backend over PostgREST
//! - [`memory::MemoryTree`] / [`memory::MemoryTable`]: in-process stand-ins

pub mod firebase;
pub mod memory;
pub mod supabase;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::types::UserRecord;

/// A tree-structured database addressed by slash-separated paths.
#[async_trait]
pub trait TreeBackend: Send + Sync {
    /// Writes every entry of `children` under `path` in one multi-path update.
    /// Existing children with the same keys are overwritten; others are untouched.
    async fn update_children(&self, path: &str, children: Map<String, Value>) -> Result<()>;

    /// Returns up to `limit` children of `path` ordered by key, starting
    /// strictly after `after` when a cursor is given.
    async fn children_after(
        &self,
        path: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, Value)>>;

    /// Releases any per-process resources held by the client.
    async fn release(&self) {}
}

/// One page of rows from a ranged select.
#[derive(Debug, Clone, Default)]
pub struct RangePage {
    pub rows: Vec<Value>,
    /// Exact row count of the whole table, when the backend reported it.
    pub total: Option<usize>,
}

/// A relational table store with bulk insert and ranged selects.
#[async_trait]
pub trait RelationalBackend: Send + Sync {
    async fn insert(&self, table: &str, rows: &[UserRecord]) -> Result<()>;

    /// Selects `columns` for the inclusive row range `from..=to` along with
    /// the table's exact row count.
    async fn select_range(
        &self,
        table: &str,
        columns: &str,
        from: usize,
        to: usize,
    ) -> Result<RangePage>;

    async fn select_limit(&self, table: &str, columns: &str, limit: usize) -> Result<Vec<Value>>;
}

/// Turns a non-2xx response into an error naming the backend and operation.
///
/// `extract` pulls the service's message out of a JSON error body; bodies it
/// cannot read are reported verbatim.
pub(crate) async fn check_status(
    response: reqwest::Response,
    backend: &str,
    what: &str,
    extract: fn(&Value) -> Option<String>,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!(
        "{backend} {what} failed ({status}): {}",
        error_message(&body, extract)
    ))
}

pub(crate) fn error_message(body: &str, extract: fn(&Value) -> Option<String>) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(extract)
        .unwrap_or_else(|| body.to_string())
}

/// Orders child keys the way the realtime database does: keys that parse as
/// 32-bit integers come first in numeric order, every other key follows in
/// lexicographic order.
pub fn compare_child_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn integer_key(key: &str) -> Option<i32> {
    // "01" or "+1" are plain strings to the database.
    let canonical = key == "0"
        || key
            .strip_prefix('-')
            .unwrap_or(key)
            .chars()
            .next()
            .is_some_and(|c| ('1'..='9').contains(&c));
    if !canonical {
        return None;
    }
    key.parse().ok()
}
