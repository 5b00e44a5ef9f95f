use crate::model::{errors::ModelError, types::ModelVersion};
use crate::storage::GENERIC_DATA_STORE;

use super::postgres::*;
use super::sqlite::*;

pub struct ModelStore;

impl ModelStore {
    /// Initialize the model version table
    pub(crate) async fn init() -> Result<(), ModelError> {
        let store = GENERIC_DATA_STORE.lock().await;

        match (store.as_sqlite(), store.as_postgres()) {
            (Some(pool), _) => {
                create_tables_sqlite(pool).await?;
                validate_model_tables_sqlite(pool).await?;
                Ok(())
            }
            (_, Some(pool)) => {
                create_tables_postgres(pool).await?;
                validate_model_tables_postgres(pool).await?;
                Ok(())
            }
            _ => Err(ModelError::Storage("Unsupported database type".to_string())),
        }
    }

    pub async fn insert_version(version: &ModelVersion) -> Result<(), ModelError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            insert_version_sqlite(pool, version).await
        } else if let Some(pool) = store.as_postgres() {
            insert_version_postgres(pool, version).await
        } else {
            Err(ModelError::Storage("Unsupported database type".to_string()))
        }
    }

    /// The single authoritative model version, if any has ever been promoted
    pub async fn get_active() -> Result<Option<ModelVersion>, ModelError> {
        let store = GENERIC_DATA_STORE.lock().await;

        if let Some(pool) = store.as_sqlite() {
            get_active_sqlite(pool).await
        } else if let Some(pool) = store.as_postgres() {
            get_active_postgres(pool).await
        } else {
            Err(ModelError::Storage("Unsupported database type".to_string()))
        }
    }

    /// Promote `version_id`, atomically deactivating the previous version.
    ///
    /// `expected_active` must match the caller's last read of the active
    /// version; otherwise the promotion fails with [`ModelError::Conflict`]
    /// and the caller retries with fresh state.
    #[tracing::instrument(fields(version_id = %version_id))]
    pub async fn compare_and_activate(
        version_id: &str,
        expected_active: Option<&str>,
    ) -> Result<(), ModelError> {
        let store = GENERIC_DATA_STORE.lock().await;

        let result = if let Some(pool) = store.as_sqlite() {
            compare_and_activate_sqlite(pool, version_id, expected_active).await
        } else if let Some(pool) = store.as_postgres() {
            compare_and_activate_postgres(pool, version_id, expected_active).await
        } else {
            Err(ModelError::Storage("Unsupported database type".to_string()))
        };

        match &result {
            Ok(()) => tracing::info!("Model version activated"),
            Err(ModelError::Conflict) => {
                tracing::warn!("Model activation lost a race, caller should retry")
            }
            Err(e) => tracing::error!(error = %e, "Model activation failed"),
        }

        result
    }
}
