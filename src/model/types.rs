use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::path::PathBuf;

/// Metadata row for one trained recognition model
///
/// At most one row is active at any time; activation atomically deactivates
/// the predecessor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ModelVersion {
    /// Database-assigned sequence number (primary key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<i64>,
    /// Version label, e.g. `v20250101_120000`
    pub version_id: String,
    /// SHA-256 hex digest of the model artifact
    pub content_hash: String,
    /// Where the artifact can be downloaded from
    pub source_uri: String,
    /// When training completed
    pub trained_at: DateTime<Utc>,
    /// How many users the training set covered
    pub user_count: i64,
    /// Whether this is the authoritative model
    pub is_active: bool,
}

/// The verified model artifact currently loaded on the edge device
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub version_id: String,
    pub content_hash: String,
    pub artifact_path: PathBuf,
}

/// Result of one synchronization pass
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The loaded model already matches the cloud's active version
    UpToDate,
    /// A new version was downloaded, verified and swapped in
    Installed { version_id: String },
    /// The cloud has no trained model yet
    NoActiveModel,
}

/// Sidecar state persisted next to the cached artifact so a restart can
/// skip re-downloading an unchanged model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct PersistedModelState {
    pub version_id: String,
    pub content_hash: String,
    /// Artifact file name relative to the model directory
    pub artifact_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_state_roundtrip() {
        let state = PersistedModelState {
            version_id: "v20250101_120000".to_string(),
            content_hash: "deadbeef".to_string(),
            artifact_file: "model-deadbeef.bin".to_string(),
        };
        let json = serde_json::to_string(&state).expect("serialization should succeed");
        let back: PersistedModelState =
            serde_json::from_str(&json).expect("deserialization should succeed");
        assert_eq!(back, state);
    }
}
