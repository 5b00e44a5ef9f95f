use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::linking::{
    errors::LinkingError,
    types::{ClaimedLink, LinkingChallenge},
};
use crate::storage::{DB_TABLE_LINKING_CHALLENGES, DB_TABLE_USERS, validate_postgres_table_schema};

// PostgreSQL implementations
pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            sequence_number BIGSERIAL PRIMARY KEY,
            code TEXT NOT NULL,
            user_id TEXT NOT NULL,
            issued_at TIMESTAMPTZ NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            claimed BOOLEAN NOT NULL DEFAULT false
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    Ok(())
}

/// Validates that the challenge table schema matches what we expect
pub(super) async fn validate_challenge_tables_postgres(
    pool: &Pool<Postgres>,
) -> Result<(), LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    let expected_columns = vec![
        ("sequence_number", "bigint"),
        ("code", "text"),
        ("user_id", "text"),
        ("issued_at", "timestamp with time zone"),
        ("expires_at", "timestamp with time zone"),
        ("claimed", "boolean"),
    ];

    validate_postgres_table_schema(pool, table_name, &expected_columns, LinkingError::Storage).await
}

pub(super) async fn insert_challenge_postgres(
    pool: &Pool<Postgres>,
    challenge: &LinkingChallenge,
) -> Result<(), LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (code, user_id, issued_at, expires_at, claimed)
        VALUES ($1, $2, $3, $4, $5)
        "#
    ))
    .bind(&challenge.code)
    .bind(&challenge.user_id)
    .bind(challenge.issued_at)
    .bind(challenge.expires_at)
    .bind(challenge.claimed)
    .execute(pool)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    Ok(())
}

/// Expires every live, unclaimed challenge for the user so only the newest
/// issued code is redeemable
pub(super) async fn expire_for_user_postgres(
    pool: &Pool<Postgres>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET expires_at = $1
        WHERE user_id = $2 AND claimed = false AND expires_at > $3
        "#
    ))
    .bind(now)
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}

/// Whether a code collides with a live, unclaimed challenge
pub(super) async fn is_code_active_postgres(
    pool: &Pool<Postgres>,
    code: &str,
    now: DateTime<Utc>,
) -> Result<bool, LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    sqlx::query_scalar(&format!(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM {table_name}
            WHERE code = $1 AND claimed = false AND expires_at > $2
        )
        "#
    ))
    .bind(code)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))
}

pub(super) async fn get_latest_by_code_postgres(
    pool: &Pool<Postgres>,
    code: &str,
) -> Result<Option<LinkingChallenge>, LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    sqlx::query_as::<_, LinkingChallenge>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE code = $1
        ORDER BY sequence_number DESC LIMIT 1
        "#
    ))
    .bind(code)
    .fetch_optional(pool)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))
}

/// Claim a challenge and bind the channel to its user in one transaction.
///
/// Mirrors the SQLite implementation: a conditional UPDATE performs the
/// compare-and-set, and the channel binding shares its transaction so a
/// conflict rolls the claim back.
pub(super) async fn claim_postgres(
    pool: &Pool<Postgres>,
    code: &str,
    channel_id: &str,
    now: DateTime<Utc>,
) -> Result<ClaimedLink, LinkingError> {
    let challenges = DB_TABLE_LINKING_CHALLENGES.as_str();
    let users = DB_TABLE_USERS.as_str();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| LinkingError::Storage(e.to_string()))?;

    let claimed_row = sqlx::query_as::<_, LinkingChallenge>(&format!(
        r#"
        UPDATE {challenges} SET claimed = true
        WHERE sequence_number = (
            SELECT sequence_number FROM {challenges}
            WHERE code = $1 AND claimed = false AND expires_at > $2
            ORDER BY sequence_number DESC LIMIT 1
            FOR UPDATE
        )
        RETURNING *
        "#
    ))
    .bind(code)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    let challenge = match claimed_row {
        Some(challenge) => challenge,
        None => {
            let row = sqlx::query_as::<_, LinkingChallenge>(&format!(
                r#"
                SELECT * FROM {challenges} WHERE code = $1
                ORDER BY sequence_number DESC LIMIT 1
                "#
            ))
            .bind(code)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| LinkingError::Storage(e.to_string()))?;

            return match row {
                Some(challenge) if challenge.claimed => Err(LinkingError::AlreadyClaimed),
                Some(challenge) if challenge.is_expired_at(now) => Err(LinkingError::Expired),
                Some(_) => Err(LinkingError::Storage(
                    "Claim update matched no row for a live challenge".to_string(),
                )),
                None => Err(LinkingError::NotFound),
            };
        }
    };

    let holder: Option<String> = sqlx::query_scalar(&format!(
        r#"
        SELECT user_id FROM {users} WHERE notification_channel_id = $1
        "#
    ))
    .bind(channel_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    if let Some(holder_id) = holder {
        if holder_id != challenge.user_id {
            return Err(LinkingError::ChannelInUse);
        }
    }

    let bound = sqlx::query(&format!(
        r#"
        UPDATE {users} SET notification_channel_id = $1, updated_at = $2
        WHERE user_id = $3
          AND (notification_channel_id IS NULL OR notification_channel_id = $1)
        "#
    ))
    .bind(channel_id)
    .bind(now)
    .bind(&challenge.user_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    if bound.rows_affected() == 0 {
        return Err(LinkingError::ChannelInUse);
    }

    tx.commit()
        .await
        .map_err(|e| LinkingError::Storage(e.to_string()))?;

    Ok(ClaimedLink {
        user_id: challenge.user_id,
        channel_id: channel_id.to_string(),
    })
}
