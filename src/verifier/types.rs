use async_trait::async_trait;

use crate::model::LoadedModel;

use super::errors::VerifierError;

/// What the face pipeline produced for a single capture
#[derive(Debug, Clone, PartialEq)]
pub struct FaceObservation {
    /// Best candidate according to the recognition model, if any
    pub user_id: Option<String>,
    pub confidence: f64,
}

/// One fingerprint sensor read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerprintReading {
    /// Template slot the sensor matched against
    pub slot: i32,
    /// Sensor-level accept decision for that slot
    pub accepted: bool,
    pub confidence: f64,
}

/// Outcome of checking one factor. `matched == false` is a determinate
/// rejection; sensor trouble is reported as `VerifierError` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    pub confidence: f64,
    pub user_id: Option<String>,
}

impl MatchResult {
    pub(crate) fn rejected(confidence: f64) -> Self {
        Self {
            matched: false,
            confidence,
            user_id: None,
        }
    }
}

/// Keypad input capability. Implementations block until a full PIN is
/// entered; the session coordinator bounds the wait with a timeout, so
/// the returned future must be cancel-safe.
#[async_trait]
pub trait PinPad: Send + Sync {
    async fn read_pin(&self) -> Result<String, VerifierError>;
}

/// Camera plus recognition pipeline. The capture runs against the model
/// it is handed, never against mutable shared state.
#[async_trait]
pub trait FaceCamera: Send + Sync {
    async fn capture(&self, model: &LoadedModel) -> Result<FaceObservation, VerifierError>;
}

/// Fingerprint sensor capability
#[async_trait]
pub trait FingerprintScanner: Send + Sync {
    async fn scan(&self) -> Result<FingerprintReading, VerifierError>;
}

/// A single authentication factor check, driven by the session coordinator
#[async_trait]
pub trait FactorVerifier: Send + Sync {
    async fn verify(&self) -> Result<MatchResult, VerifierError>;
}
