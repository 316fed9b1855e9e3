//! Chunked bulk loading of generated users into both backends.
//!
//! Chunks are written strictly in index order and each one is awaited before
//! the next is issued. The first failed chunk aborts the load; chunks that
//! were already written stay written.

use anyhow::{ensure, Context, Result};
use log::info;
use serde_json::Map;

use crate::backends::{RelationalBackend, TreeBackend};
use crate::constants::{TABLE_CHUNK_SIZE, TREE_CHUNK_SIZE, USERS_PATH, USERS_TABLE};
use crate::types::{LoadSummary, UserRecord};

/// Number of chunks of `chunk_size` needed to cover `len` records.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

/// Writes `users` under `path`, one multi-path update per chunk.
///
/// Children are keyed by each record's zero-based position in `users`, so a
/// second load over the same path overwrites instead of growing it.
pub async fn load_tree(
    backend: &dyn TreeBackend,
    path: &str,
    users: &[UserRecord],
    chunk_size: usize,
) -> Result<LoadSummary> {
    ensure!(chunk_size > 0, "chunk size must be non-zero");
    let total_chunks = chunk_count(users.len(), chunk_size);

    for (chunk_index, chunk) in users.chunks(chunk_size).enumerate() {
        let base = chunk_index * chunk_size;
        let mut children = Map::with_capacity(chunk.len());
        for (offset, user) in chunk.iter().enumerate() {
            children.insert((base + offset).to_string(), serde_json::to_value(user)?);
        }

        backend
            .update_children(path, children)
            .await
            .with_context(|| format!("writing tree chunk {} of {}", chunk_index + 1, total_chunks))?;
        info!("Firebase: Wrote chunk {} of {}", chunk_index + 1, total_chunks);
    }

    info!("Data written to Firebase");
    Ok(LoadSummary {
        chunks: total_chunks,
        records: users.len(),
    })
}

/// Inserts `users` into `table`, one bulk insert per chunk.
///
/// Every call creates new rows: the backend assigns fresh ids, so loading the
/// same users twice doubles the table.
pub async fn load_table(
    backend: &dyn RelationalBackend,
    table: &str,
    users: &[UserRecord],
    chunk_size: usize,
) -> Result<LoadSummary> {
    ensure!(chunk_size > 0, "chunk size must be non-zero");
    let total_chunks = chunk_count(users.len(), chunk_size);

    for (chunk_index, chunk) in users.chunks(chunk_size).enumerate() {
        backend.insert(table, chunk).await.with_context(|| {
            format!("inserting table chunk {} of {}", chunk_index + 1, total_chunks)
        })?;
        info!("Supabase: Wrote chunk {} of {}", chunk_index + 1, total_chunks);
    }

    info!("Data written to Supabase");
    Ok(LoadSummary {
        chunks: total_chunks,
        records: users.len(),
    })
}

/// Loads the tree backend completely, then the relational backend.
pub async fn seed_backends(
    tree: &dyn TreeBackend,
    table: &dyn RelationalBackend,
    users: &[UserRecord],
) -> Result<(LoadSummary, LoadSummary)> {
    let tree_summary = load_tree(tree, USERS_PATH, users, TREE_CHUNK_SIZE).await?;
    let table_summary = load_table(table, USERS_TABLE, users, TABLE_CHUNK_SIZE).await?;
    Ok((tree_summary, table_summary))
}
