use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("Sensor timed out waiting for input")]
    SensorTimeout,

    #[error("Confidence {confidence} below required minimum")]
    LowConfidence { confidence: f64 },

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("User error: {0}")]
    User(#[from] crate::userdb::UserError),
}
