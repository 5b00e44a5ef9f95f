//! Shared test initialization.
//!
//! Loads `.env_test` (falling back to `.env`), wipes the SQLite test
//! database once per process, and initializes every store. SQLite
//! functions ensure tables exist at the point of use, so no retry logic
//! is needed here.

use std::sync::Once;

/// Centralized test setup used by every database-touching test in the crate
pub async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        if dotenvy::from_filename(".env_test").is_err() {
            dotenvy::dotenv().ok();
        }

        // Start from an empty database file for each test run
        if let Some(db_path) = extract_sqlite_file_path() {
            let _ = std::fs::remove_file(&db_path);
        }
    });

    ensure_stores_initialized().await;
}

async fn ensure_stores_initialized() {
    if let Err(e) = crate::userdb::init().await {
        eprintln!("Warning: Failed to initialize user store: {e}");
    }
    if let Err(e) = crate::linking::init().await {
        eprintln!("Warning: Failed to initialize linking store: {e}");
    }
    if let Err(e) = crate::model::init().await {
        eprintln!("Warning: Failed to initialize model store: {e}");
    }
    if let Err(e) = crate::access_log::init().await {
        eprintln!("Warning: Failed to initialize access log store: {e}");
    }
}

/// Extract the file path from a `sqlite:` URL; None for non-SQLite or
/// in-memory databases
fn extract_sqlite_file_path_from_url(url: &str) -> Option<String> {
    let path = url.strip_prefix("sqlite:")?;

    if let Some(file_path) = path.strip_prefix("file:") {
        let path_only = file_path.split('?').next()?;
        if path_only.contains(":memory:") {
            return None;
        }
        Some(path_only.to_string())
    } else {
        let path = path.strip_prefix("//").unwrap_or(path);
        if path.contains(":memory:") {
            return None;
        }
        Some(path.to_string())
    }
}

fn extract_sqlite_file_path() -> Option<String> {
    std::env::var("EDGELOCK_DATA_STORE_URL")
        .ok()
        .and_then(|url| extract_sqlite_file_path_from_url(&url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sqlite_file_path_from_url() {
        assert_eq!(
            extract_sqlite_file_path_from_url("sqlite:/tmp/test.db"),
            Some("/tmp/test.db".to_string())
        );
        assert_eq!(
            extract_sqlite_file_path_from_url("sqlite:./test.db"),
            Some("./test.db".to_string())
        );
        assert_eq!(
            extract_sqlite_file_path_from_url("sqlite:file:/tmp/test.db?mode=rwc&cache=shared"),
            Some("/tmp/test.db".to_string())
        );
        assert_eq!(extract_sqlite_file_path_from_url("sqlite::memory:"), None);
        assert_eq!(
            extract_sqlite_file_path_from_url("sqlite:file::memory:?cache=shared"),
            None
        );
        assert_eq!(
            extract_sqlite_file_path_from_url("postgresql://localhost/test"),
            None
        );
        assert_eq!(
            extract_sqlite_file_path_from_url("sqlite:///tmp/test.db"),
            Some("/tmp/test.db".to_string())
        );
    }
}
