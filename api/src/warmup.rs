use std::sync::Arc;

use log::{error, info};
use tokio::task::JoinHandle;
use ub_core::backends::RelationalBackend;
use ub_core::constants::{NAME_COLUMN, USERS_TABLE};

/// Selects a single name so the first real request finds a warm connection.
pub(crate) async fn warm_up(table: &dyn RelationalBackend) -> anyhow::Result<()> {
    table.select_limit(USERS_TABLE, NAME_COLUMN, 1).await?;
    Ok(())
}

/// Runs [`warm_up`] on a detached task.
///
/// Failures are logged and never reach the server. The handle resolves to
/// whether the query succeeded; nothing in the server waits on it.
pub(crate) fn spawn_warm_up(table: Arc<dyn RelationalBackend>) -> JoinHandle<bool> {
    tokio::spawn(async move {
        match warm_up(table.as_ref()).await {
            Ok(()) => {
                info!("Supabase warm-up query executed");
                true
            }
            Err(err) => {
                error!("Error during Supabase warm-up: {err:#}");
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::spawn_warm_up;
    use std::sync::Arc;
    use ub_core::backends::memory::MemoryTable;

    #[tokio::test]
    async fn warm_up_issues_one_select() {
        let table = Arc::new(MemoryTable::new());
        assert!(spawn_warm_up(table.clone()).await.unwrap());
        assert_eq!(table.select_calls(), 1);
    }

    #[tokio::test]
    async fn warm_up_failure_is_reported_not_raised() {
        let table = Arc::new(MemoryTable::new().failing_select_at(0));
        assert!(!spawn_warm_up(table).await.unwrap());
    }
}
