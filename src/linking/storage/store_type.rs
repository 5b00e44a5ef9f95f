use chrono::{DateTime, Utc};

use crate::linking::{
    errors::LinkingError,
    types::{ClaimedLink, LinkingChallenge},
};
use crate::storage::GENERIC_DATA_STORE;

use super::postgres::*;
use super::sqlite::*;

pub(crate) struct ChallengeStore;

impl ChallengeStore {
    /// Initialize the linking challenge table
    pub(crate) async fn init() -> Result<(), LinkingError> {
        let store = GENERIC_DATA_STORE.lock().await;

        match (store.as_sqlite(), store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool).await?;
                validate_challenge_tables_sqlite(pool).await?;
                Ok(())
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool).await?;
                validate_challenge_tables_postgres(pool).await?;
                Ok(())
            }
            _ => Err(LinkingError::Storage(
                "Unsupported database type".to_string(),
            )),
        }
    }

    pub(crate) async fn insert(challenge: &LinkingChallenge) -> Result<(), LinkingError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            insert_challenge_sqlite(pool, challenge).await
        } else if let Some(pool) = store.as_postgres() {
            insert_challenge_postgres(pool, challenge).await
        } else {
            Err(LinkingError::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Expire the user's live unclaimed challenges; returns how many were cut short
    pub(crate) async fn expire_for_user(
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, LinkingError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            expire_for_user_sqlite(pool, user_id, now).await
        } else if let Some(pool) = store.as_postgres() {
            expire_for_user_postgres(pool, user_id, now).await
        } else {
            Err(LinkingError::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    pub(crate) async fn is_code_active(code: &str, now: DateTime<Utc>) -> Result<bool, LinkingError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            is_code_active_sqlite(pool, code, now).await
        } else if let Some(pool) = store.as_postgres() {
            is_code_active_postgres(pool, code, now).await
        } else {
            Err(LinkingError::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    pub(crate) async fn get_latest_by_code(
        code: &str,
    ) -> Result<Option<LinkingChallenge>, LinkingError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_latest_by_code_sqlite(pool, code).await
        } else if let Some(pool) = store.as_postgres() {
            get_latest_by_code_postgres(pool, code).await
        } else {
            Err(LinkingError::Storage(
                "Unsupported database type".to_string(),
            ))
        }
    }

    /// Transactional compare-and-set claim; see the backend implementations
    #[tracing::instrument(fields(code = %code, channel_id = %channel_id))]
    pub(crate) async fn claim(
        code: &str,
        channel_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimedLink, LinkingError> {
        let store = GENERIC_DATA_STORE.lock().await;

        let result = if let Some(pool) = store.as_sqlite() {
            claim_sqlite(pool, code, channel_id, now).await
        } else if let Some(pool) = store.as_postgres() {
            claim_postgres(pool, code, channel_id, now).await
        } else {
            Err(LinkingError::Storage(
                "Unsupported database type".to_string(),
            ))
        };

        match &result {
            Ok(link) => {
                tracing::info!(user_id = %link.user_id, "Linking challenge claimed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Linking challenge claim rejected");
            }
        }

        result
    }
}
