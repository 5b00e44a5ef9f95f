use chrono::{DateTime, Utc};

use crate::access_log::{errors::AccessLogError, types::AccessLogEntry};
use crate::storage::GENERIC_DATA_STORE;

use super::postgres::*;
use super::sqlite::*;

pub(crate) struct AccessLogStore;

impl AccessLogStore {
    /// Initialize the access log table
    pub(crate) async fn init() -> Result<(), AccessLogError> {
        let store = GENERIC_DATA_STORE.lock().await;

        match (store.as_sqlite(), store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool).await?;
                validate_access_log_tables_sqlite(pool).await?;
                Ok(())
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool).await?;
                validate_access_log_tables_postgres(pool).await?;
                Ok(())
            }
            _ => Err(AccessLogError::Storage(
                "Unsupported database type".to_string(),
            )),
        }
    }

    /// Append one entry; entries are never updated or deleted afterwards
    #[tracing::instrument(skip(entry), fields(log_id = %entry.log_id, outcome = %entry.outcome))]
    pub(crate) async fn append(entry: &AccessLogEntry) -> Result<(), AccessLogError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            append_entry_sqlite(pool, entry).await
        } else if let Some(pool) = store.as_postgres() {
            append_entry_postgres(pool, entry).await
        } else {
            Err(AccessLogError::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Count failed-attempt entries newer than `since`
    pub(crate) async fn count_failures_since(since: DateTime<Utc>) -> Result<i64, AccessLogError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            count_failures_since_sqlite(pool, since).await
        } else if let Some(pool) = store.as_postgres() {
            count_failures_since_postgres(pool, since).await
        } else {
            Err(AccessLogError::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Most recent entries, newest first
    pub(crate) async fn get_recent(limit: i64) -> Result<Vec<AccessLogEntry>, AccessLogError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_recent_entries_sqlite(pool, limit).await
        } else if let Some(pool) = store.as_postgres() {
            get_recent_entries_postgres(pool, limit).await
        } else {
            Err(AccessLogError::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }
}
