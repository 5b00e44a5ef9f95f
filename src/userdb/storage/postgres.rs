use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::storage::{DB_TABLE_USERS, validate_postgres_table_schema};
use crate::userdb::{
    errors::UserError,
    types::{User, UserSearchField},
};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            sequence_number BIGSERIAL PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            pin_hash TEXT NOT NULL,
            fingerprint_slot INTEGER UNIQUE,
            is_admin BOOLEAN NOT NULL DEFAULT false,
            is_active BOOLEAN NOT NULL DEFAULT true,
            notification_channel_id TEXT UNIQUE,
            last_access TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the User table schema matches what we expect
pub(super) async fn validate_user_tables_postgres(pool: &Pool<Postgres>) -> Result<(), UserError> {
    let users_table = DB_TABLE_USERS.as_str();

    // Define expected schema (column name, data type)
    let expected_columns = vec![
        ("sequence_number", "bigint"),
        ("user_id", "text"),
        ("name", "text"),
        ("email", "text"),
        ("pin_hash", "text"),
        ("fingerprint_slot", "integer"),
        ("is_admin", "boolean"),
        ("is_active", "boolean"),
        ("notification_channel_id", "text"),
        ("last_access", "timestamp with time zone"),
        ("created_at", "timestamp with time zone"),
        ("updated_at", "timestamp with time zone"),
    ];

    validate_postgres_table_schema(pool, users_table, &expected_columns, UserError::Storage).await
}

pub(super) async fn get_all_active_users_postgres(
    pool: &Pool<Postgres>,
) -> Result<Vec<User>, UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE is_active = true ORDER BY sequence_number ASC
        "#
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))
}

pub(super) async fn get_user_by_field_postgres(
    pool: &Pool<Postgres>,
    field: &UserSearchField,
) -> Result<Option<User>, UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    match field {
        UserSearchField::Id(id) => sqlx::query_as::<_, User>(&format!(
            r#"
                SELECT * FROM {table_name} WHERE user_id = $1
                "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string())),
        UserSearchField::FingerprintSlot(slot) => sqlx::query_as::<_, User>(&format!(
            r#"
                SELECT * FROM {table_name} WHERE fingerprint_slot = $1
                "#
        ))
        .bind(slot)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string())),
        UserSearchField::NotificationChannel(channel_id) => sqlx::query_as::<_, User>(&format!(
            r#"
                SELECT * FROM {table_name} WHERE notification_channel_id = $1
                "#
        ))
        .bind(channel_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string())),
    }
}

pub(super) async fn upsert_user_postgres(
    pool: &Pool<Postgres>,
    user: User,
) -> Result<User, UserError> {
    let table_name = DB_TABLE_USERS.as_str();
    let now = Utc::now();
    let mut updated_user = user;
    updated_user.updated_at = now;

    let result = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO {table_name}
            (user_id, name, email, pin_hash, fingerprint_slot, is_admin, is_active,
             notification_channel_id, last_access, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (user_id) DO UPDATE SET
            name = excluded.name,
            email = excluded.email,
            pin_hash = excluded.pin_hash,
            fingerprint_slot = excluded.fingerprint_slot,
            is_admin = excluded.is_admin,
            is_active = excluded.is_active,
            notification_channel_id = excluded.notification_channel_id,
            last_access = excluded.last_access,
            updated_at = $12
        RETURNING *
        "#
    ))
    .bind(&updated_user.user_id)
    .bind(&updated_user.name)
    .bind(&updated_user.email)
    .bind(&updated_user.pin_hash)
    .bind(updated_user.fingerprint_slot)
    .bind(updated_user.is_admin)
    .bind(updated_user.is_active)
    .bind(&updated_user.notification_channel_id)
    .bind(updated_user.last_access)
    .bind(updated_user.created_at)
    .bind(updated_user.updated_at)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(result)
}

pub(super) async fn deactivate_user_postgres(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET is_active = false, updated_at = $1 WHERE user_id = $2
        "#
    ))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }

    Ok(())
}

pub(super) async fn set_last_access_postgres(
    pool: &Pool<Postgres>,
    id: &str,
    timestamp: DateTime<Utc>,
) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET last_access = $1, updated_at = $2 WHERE user_id = $3
        "#
    ))
    .bind(timestamp)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }

    Ok(())
}
