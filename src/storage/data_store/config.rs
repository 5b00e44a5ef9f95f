//! Data store connection and table configuration

use std::{env, str::FromStr, sync::LazyLock};
use tokio::sync::Mutex;

use super::types::{DataStore, PostgresDataStore, SqliteDataStore};

// Configuration
static EDGELOCK_DATA_STORE_TYPE: LazyLock<String> = LazyLock::new(|| {
    env::var("EDGELOCK_DATA_STORE_TYPE").expect("EDGELOCK_DATA_STORE_TYPE must be set")
});

static EDGELOCK_DATA_STORE_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("EDGELOCK_DATA_STORE_URL").expect("EDGELOCK_DATA_STORE_URL must be set")
});

pub(crate) static GENERIC_DATA_STORE: LazyLock<Mutex<Box<dyn DataStore>>> = LazyLock::new(|| {
    let store_type = EDGELOCK_DATA_STORE_TYPE.as_str();
    let store_url = EDGELOCK_DATA_STORE_URL.as_str();

    tracing::info!(
        "Initializing data store with type: {}, url: {}",
        store_type,
        store_url
    );

    let store = match store_type {
        "sqlite" => {
            let opts = sqlx::sqlite::SqliteConnectOptions::from_str(store_url)
                .expect("Failed to parse SQLite connection string")
                .create_if_missing(true);

            Box::new(SqliteDataStore {
                pool: sqlx::sqlite::SqlitePool::connect_lazy_with(opts),
            }) as Box<dyn DataStore>
        }
        "postgres" => Box::new(PostgresDataStore {
            pool: sqlx::PgPool::connect_lazy(store_url).expect("Failed to create Postgres pool"),
        }) as Box<dyn DataStore>,
        t => panic!(
            "Unsupported store type: {}. Supported types are 'sqlite' and 'postgres'",
            t
        ),
    };

    Mutex::new(store)
});

/// Table prefix from environment variable
pub(crate) static DB_TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("EDGELOCK_TABLE_PREFIX").unwrap_or_else(|_| "edgelock_".to_string()));

pub(crate) static DB_TABLE_USERS: LazyLock<String> =
    LazyLock::new(|| format!("{}users", DB_TABLE_PREFIX.as_str()));

pub(crate) static DB_TABLE_LINKING_CHALLENGES: LazyLock<String> =
    LazyLock::new(|| format!("{}linking_challenges", DB_TABLE_PREFIX.as_str()));

pub(crate) static DB_TABLE_ACCESS_LOGS: LazyLock<String> =
    LazyLock::new(|| format!("{}access_logs", DB_TABLE_PREFIX.as_str()));

pub(crate) static DB_TABLE_MODEL_VERSIONS: LazyLock<String> =
    LazyLock::new(|| format!("{}model_versions", DB_TABLE_PREFIX.as_str()));
