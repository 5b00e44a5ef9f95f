use sqlx::{Pool, Postgres};

use crate::model::{errors::ModelError, types::ModelVersion};
use crate::storage::{DB_TABLE_MODEL_VERSIONS, validate_postgres_table_schema};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), ModelError> {
    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            sequence_number BIGSERIAL PRIMARY KEY,
            version_id TEXT NOT NULL UNIQUE,
            content_hash TEXT NOT NULL,
            source_uri TEXT NOT NULL,
            trained_at TIMESTAMPTZ NOT NULL,
            user_count BIGINT NOT NULL,
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
pub(super) async fn validate_model_tables_postgres(
    pool: &Pool<Postgres>,
) -> Result<(), ModelError> {
    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    let expected_columns = vec![
        ("sequence_number", "bigint"),
        ("version_id", "text"),
        ("content_hash", "text"),
        ("source_uri", "text"),
        ("trained_at", "timestamp with time zone"),
        ("user_count", "bigint"),
        ("is_active", "boolean"),
    ];

    validate_postgres_table_schema(pool, table_name, &expected_columns, ModelError::Storage).await
}

pub(super) async fn insert_version_postgres(
    pool: &Pool<Postgres>,
    version: &ModelVersion,
) -> Result<(), ModelError> {
    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name}
            (version_id, content_hash, source_uri, trained_at, user_count, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
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

pub(super) async fn get_active_postgres(
    pool: &Pool<Postgres>,
) -> Result<Option<ModelVersion>, ModelError> {
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

/// Atomic deactivate-old/activate-new; see the SQLite implementation
pub(super) async fn compare_and_activate_postgres(
    pool: &Pool<Postgres>,
    version_id: &str,
    expected_active: Option<&str>,
) -> Result<(), ModelError> {
    let table_name = DB_TABLE_MODEL_VERSIONS.as_str();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ModelError::Storage(e.to_string()))?;

    let actual_active: Option<String> = sqlx::query_scalar(&format!(
        r#"
        SELECT version_id FROM {table_name} WHERE is_active = true
        ORDER BY sequence_number DESC LIMIT 1
        FOR UPDATE
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
        UPDATE {table_name} SET is_active = true WHERE version_id = $1
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
