use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::access_log::{
    errors::AccessLogError,
    types::{AccessLogEntry, AccessOutcome, FactorConfidences},
};
use crate::storage::{DB_TABLE_ACCESS_LOGS, validate_postgres_table_schema};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), AccessLogError> {
    let table_name = DB_TABLE_ACCESS_LOGS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            log_id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT,
            outcome TEXT NOT NULL,
            confidences TEXT NOT NULL,
            notes TEXT,
            timestamp TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| AccessLogError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn validate_access_log_tables_postgres(
    pool: &Pool<Postgres>,
) -> Result<(), AccessLogError> {
    let table_name = DB_TABLE_ACCESS_LOGS.as_str();

    let expected_columns = vec![
        ("log_id", "text"),
        ("user_id", "text"),
        ("outcome", "text"),
        ("confidences", "text"),
        ("notes", "text"),
        ("timestamp", "timestamp with time zone"),
    ];

    validate_postgres_table_schema(pool, table_name, &expected_columns, AccessLogError::Storage)
        .await
}

pub(super) async fn append_entry_postgres(
    pool: &Pool<Postgres>,
    entry: &AccessLogEntry,
) -> Result<(), AccessLogError> {
    let table_name = DB_TABLE_ACCESS_LOGS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (log_id, user_id, outcome, confidences, notes, timestamp)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#
    ))
    .bind(&entry.log_id)
    .bind(&entry.user_id)
    .bind(entry.outcome.as_str())
    .bind(serde_json::to_string(&entry.confidences)?)
    .bind(&entry.notes)
    .bind(entry.timestamp)
    .execute(pool)
    .await
    .map_err(|e| AccessLogError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn count_failures_since_postgres(
    pool: &Pool<Postgres>,
    since: DateTime<Utc>,
) -> Result<i64, AccessLogError> {
    let table_name = DB_TABLE_ACCESS_LOGS.as_str();

    let row = sqlx::query(&format!(
        r#"
        SELECT COUNT(*) AS failures FROM {table_name}
        WHERE timestamp > $1
          AND outcome IN ('failed_password', 'failed_face', 'failed_fingerprint')
        "#
    ))
    .bind(since)
    .fetch_one(pool)
    .await
    .map_err(|e| AccessLogError::Storage(e.to_string()))?;

    Ok(row.get::<i64, _>("failures"))
}

pub(super) async fn get_recent_entries_postgres(
    pool: &Pool<Postgres>,
    limit: i64,
) -> Result<Vec<AccessLogEntry>, AccessLogError> {
    let table_name = DB_TABLE_ACCESS_LOGS.as_str();

    let rows = sqlx::query(&format!(
        r#"
        SELECT log_id, user_id, outcome, confidences, notes, timestamp
        FROM {table_name}
        ORDER BY timestamp DESC LIMIT $1
        "#
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AccessLogError::Storage(e.to_string()))?;

    rows.into_iter().map(entry_from_columns).collect()
}

fn entry_from_columns(row: sqlx::postgres::PgRow) -> Result<AccessLogEntry, AccessLogError> {
    let outcome_str: String = row.get("outcome");
    let outcome = AccessOutcome::from_str_opt(&outcome_str).ok_or_else(|| {
        AccessLogError::InvalidData(format!("Unknown access outcome: {outcome_str}"))
    })?;
    let confidences_json: String = row.get("confidences");
    let confidences: FactorConfidences = serde_json::from_str(&confidences_json)?;

    Ok(AccessLogEntry {
        log_id: row.get("log_id"),
        user_id: row.get("user_id"),
        outcome,
        confidences,
        notes: row.get("notes"),
        timestamp: row.get("timestamp"),
    })
}
