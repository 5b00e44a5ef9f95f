use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

use crate::linking::{
    errors::LinkingError,
    types::{ClaimedLink, LinkingChallenge},
};
use crate::storage::{DB_TABLE_LINKING_CHALLENGES, DB_TABLE_USERS, validate_sqlite_table_schema};

// SQLite implementations
pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            sequence_number INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL,
            user_id TEXT NOT NULL,
            issued_at TIMESTAMP NOT NULL,
            expires_at TIMESTAMP NOT NULL,
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
pub(super) async fn validate_challenge_tables_sqlite(
    pool: &Pool<Sqlite>,
) -> Result<(), LinkingError> {
    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    let expected_columns = vec![
        ("sequence_number", "INTEGER"),
        ("code", "TEXT"),
        ("user_id", "TEXT"),
        ("issued_at", "TIMESTAMP"),
        ("expires_at", "TIMESTAMP"),
        ("claimed", "BOOLEAN"),
    ];

    validate_sqlite_table_schema(pool, table_name, &expected_columns, LinkingError::Storage).await
}

pub(super) async fn insert_challenge_sqlite(
    pool: &Pool<Sqlite>,
    challenge: &LinkingChallenge,
) -> Result<(), LinkingError> {
    // Ensure tables exist before any operations - this is critical for in-memory databases
    create_tables_sqlite(pool).await?;

    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (code, user_id, issued_at, expires_at, claimed)
        VALUES (?, ?, ?, ?, ?)
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
pub(super) async fn expire_for_user_sqlite(
    pool: &Pool<Sqlite>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, LinkingError> {
    create_tables_sqlite(pool).await?;

    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET expires_at = ?
        WHERE user_id = ? AND claimed = false AND expires_at > ?
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
pub(super) async fn is_code_active_sqlite(
    pool: &Pool<Sqlite>,
    code: &str,
    now: DateTime<Utc>,
) -> Result<bool, LinkingError> {
    create_tables_sqlite(pool).await?;

    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    let row = sqlx::query(&format!(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM {table_name}
            WHERE code = ? AND claimed = false AND expires_at > ?
        ) AS in_use
        "#
    ))
    .bind(code)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    Ok(row.get::<bool, _>("in_use"))
}

pub(super) async fn get_latest_by_code_sqlite(
    pool: &Pool<Sqlite>,
    code: &str,
) -> Result<Option<LinkingChallenge>, LinkingError> {
    create_tables_sqlite(pool).await?;

    let table_name = DB_TABLE_LINKING_CHALLENGES.as_str();

    sqlx::query_as::<_, LinkingChallenge>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE code = ?
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
/// The claim itself is a conditional UPDATE (code unclaimed and unexpired),
/// so of two concurrent claims exactly one can flip `claimed`. The channel
/// binding happens inside the same transaction; any conflict rolls the claim
/// back, leaving the code redeemable by the rightful channel.
pub(super) async fn claim_sqlite(
    pool: &Pool<Sqlite>,
    code: &str,
    channel_id: &str,
    now: DateTime<Utc>,
) -> Result<ClaimedLink, LinkingError> {
    create_tables_sqlite(pool).await?;

    let challenges = DB_TABLE_LINKING_CHALLENGES.as_str();
    let users = DB_TABLE_USERS.as_str();

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| LinkingError::Storage(e.to_string()))?;

    // Compare-and-set: only an unclaimed, unexpired challenge flips
    let claimed = sqlx::query(&format!(
        r#"
        UPDATE {challenges} SET claimed = true
        WHERE code = ? AND claimed = false AND expires_at > ?
        "#
    ))
    .bind(code)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    if claimed.rows_affected() == 0 {
        // Discriminate the failure against the newest row for the code
        let row = sqlx::query_as::<_, LinkingChallenge>(&format!(
            r#"
            SELECT * FROM {challenges} WHERE code = ?
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

    let challenge = sqlx::query_as::<_, LinkingChallenge>(&format!(
        r#"
        SELECT * FROM {challenges} WHERE code = ? AND claimed = true
        ORDER BY sequence_number DESC LIMIT 1
        "#
    ))
    .bind(code)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    // The channel may not belong to anyone else
    let holder: Option<String> = sqlx::query_scalar(&format!(
        r#"
        SELECT user_id FROM {users} WHERE notification_channel_id = ?
        "#
    ))
    .bind(channel_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| LinkingError::Storage(e.to_string()))?;

    if let Some(holder_id) = holder {
        if holder_id != challenge.user_id {
            // Dropping the transaction rolls the claim back
            return Err(LinkingError::ChannelInUse);
        }
    }

    // Bind only if the user has no channel yet (or already this one)
    let bound = sqlx::query(&format!(
        r#"
        UPDATE {users} SET notification_channel_id = ?, updated_at = ?
        WHERE user_id = ?
          AND (notification_channel_id IS NULL OR notification_channel_id = ?)
        "#
    ))
    .bind(channel_id)
    .bind(now)
    .bind(&challenge.user_id)
    .bind(channel_id)
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
