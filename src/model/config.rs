//! Model cache and synchronization configuration

use std::{env, sync::LazyLock};

/// Directory holding the cached artifact, staging downloads and the sidecar
/// state file
///
/// Default: "./models"
pub(crate) static MODEL_DIR: LazyLock<String> =
    LazyLock::new(|| env::var("EDGELOCK_MODEL_DIR").unwrap_or_else(|_| "./models".to_string()));

/// Hours between periodic synchronization checks
///
/// Default: 6
pub(crate) static SYNC_INTERVAL_HOURS: LazyLock<u64> = LazyLock::new(|| {
    env::var("EDGELOCK_SYNC_INTERVAL_HOURS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(6)
});

/// Sidecar file name inside the model directory
pub(crate) const MODEL_STATE_FILE: &str = "model_state.json";

/// Staging file name used while a download is being verified
pub(crate) const MODEL_STAGING_FILE: &str = "staging.download";
