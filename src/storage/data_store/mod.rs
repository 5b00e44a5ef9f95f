mod config;
mod types;

pub(crate) use config::{
    DB_TABLE_ACCESS_LOGS, DB_TABLE_LINKING_CHALLENGES, DB_TABLE_MODEL_VERSIONS, DB_TABLE_USERS,
    GENERIC_DATA_STORE,
};
pub use types::DataStore;
