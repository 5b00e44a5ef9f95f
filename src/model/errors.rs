use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Clone, Error, Debug)]
pub enum ModelError {
    /// Cloud gateway unreachable; the previously loaded model stays active
    #[error("Cloud gateway unreachable: {0}")]
    Unreachable(String),

    /// Downloaded artifact digest does not match the advertised hash; the
    /// download is discarded
    #[error("Model integrity mismatch: expected {expected}, computed {computed}")]
    IntegrityMismatch { expected: String, computed: String },

    /// A training/promotion job is already running
    #[error("Model retraining already in progress")]
    AlreadyInProgress,

    /// The active version changed underneath a promotion; retry with fresh state
    #[error("Concurrent model activation conflict")]
    Conflict,

    /// Version row missing for the requested operation
    #[error("Model version not found: {0}")]
    VersionNotFound(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<GatewayError> for ModelError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unreachable(msg) => ModelError::Unreachable(msg),
            other => ModelError::Gateway(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_unreachable_is_preserved() {
        let err = ModelError::from(GatewayError::Unreachable("no route".to_string()));
        assert!(matches!(err, ModelError::Unreachable(_)));

        let err = ModelError::from(GatewayError::Status(500));
        assert!(matches!(err, ModelError::Gateway(_)));
    }
}
