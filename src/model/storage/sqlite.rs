use sqlx::{Pool, Sqlite};

use crate::model::{errors::ModelError, types::ModelVersion};
use crate::storage::{DB_TABLE_MODEL_VERSIONS, validate_sqlite_table_schema};

// SQLite implementations
pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), ModelError> {
    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            sequence_number INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id TEXT NOT NULL UNIQUE,
            content_hash TEXT NOT NULL,
            source_uri TEXT NOT NULL,
            trained_at TIMESTAMP NOT NULL,
            user_count INTEGER NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT false
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| ModelError::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the model version table schema matches what we expect
pub(super) async fn validate_model_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), ModelError> {
    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    let expected_columns = vec![
        ("sequence_number", "INTEGER"),
        ("version_id", "TEXT"),
        ("content_hash", "TEXT"),
        ("source_uri", "TEXT"),
        ("trained_at", "TIMESTAMP"),
        ("user_count", "INTEGER"),
        ("is_active", "BOOLEAN"),
    ];

    validate_sqlite_table_schema(pool, table_name, &expected_columns, ModelError::Storage).await
}

pub(super) async fn insert_version_sqlite(
    pool: &Pool<Sqlite>,
    version: &ModelVersion,
) -> Result<(), ModelError> {
    // Ensure tables exist before any operations - this is critical for in-memory databases
    create_tables_sqlite(pool).await?;

    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name}
            (version_id, content_hash, source_uri, trained_at, user_count, is_active)
        VALUES (?, ?, ?, ?, ?, ?)
        "#
    ))
    .bind(&version.version_id)
    .bind(&version.content_hash)
    .bind(&version.source_uri)
    .bind(version.trained_at)
    .bind(version.user_count)
    .bind(version.is_active)
    .execute(pool)
    .await
    .map_err(|e| ModelError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_active_sqlite(
    pool: &Pool<Sqlite>,
) -> Result<Option<ModelVersion>, ModelError> {
    create_tables_sqlite(pool).await?;

    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    sqlx::query_as::<_, ModelVersion>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE is_active = true
        ORDER BY sequence_number DESC LIMIT 1
        "#
    ))
    .fetch_optional(pool)
    .await
    .map_err(|e| ModelError::Storage(e.to_string()))
}

/// Atomically deactivate the expected active version and activate the new
/// one, so readers never observe zero or two active rows.
///
/// `expected_active` is the caller's view of the current active version id;
/// a mismatch means someone else promoted in between and yields `Conflict`.
pub(super) async fn compare_and_activate_sqlite(
    pool: &Pool<Sqlite>,
    version_id: &str,
    expected_active: Option<&str>,
) -> Result<(), ModelError> {
    create_tables_sqlite(pool).await?;

    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ModelError::Storage(e.to_string()))?;

    let actual_active: Option<String> = sqlx::query_scalar(&format!(
        r#"
        SELECT version_id FROM {table_name} WHERE is_active = true
        ORDER BY sequence_number DESC LIMIT 1
        "#
    ))
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ModelError::Storage(e.to_string()))?;

    if actual_active.as_deref() != expected_active {
        return Err(ModelError::Conflict);
    }

    sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET is_active = false WHERE is_active = true
        "#
    ))
    .execute(&mut *tx)
    .await
    .map_err(|e| ModelError::Storage(e.to_string()))?;

    let activated = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET is_active = true WHERE version_id = ?
        "#
    ))
    .bind(version_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| ModelError::Storage(e.to_string()))?;

    if activated.rows_affected() == 0 {
        return Err(ModelError::VersionNotFound(version_id.to_string()));
    }

    tx.commit()
        .await
        .map_err(|e| ModelError::Storage(e.to_string()))?;

    Ok(())
}
