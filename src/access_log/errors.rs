use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessLogError {
    #[error("User error: {0}")]
    User(#[from] crate::userdb::UserError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid log data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for AccessLogError {
    fn from(err: sqlx::Error) -> Self {
        AccessLogError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AccessLogError {
    fn from(err: serde_json::Error) -> Self {
        AccessLogError::InvalidData(err.to_string())
    }
}

/// Notification delivery failure, surfaced by the channel implementations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Channel configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Delivery(err.to_string())
    }
}
