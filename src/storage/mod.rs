mod data_store;
mod errors;
mod schema_validation;

pub async fn init() -> Result<(), errors::StorageError> {
    let _ = *data_store::GENERIC_DATA_STORE;

    Ok(())
}

pub use errors::StorageError;

pub(crate) use data_store::{
    DB_TABLE_ACCESS_LOGS, DB_TABLE_LINKING_CHALLENGES, DB_TABLE_MODEL_VERSIONS, DB_TABLE_USERS,
    GENERIC_DATA_STORE,
};
pub use data_store::DataStore;

// Re-export schema validation functions for internal use
pub(crate) use schema_validation::{validate_postgres_table_schema, validate_sqlite_table_schema};
