use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Another session is already in flight; the request is rejected, not queued
    #[error("A session is already in progress")]
    Busy,

    #[error("Verifier error: {0}")]
    Verifier(#[from] crate::verifier::VerifierError),

    #[error("Access log error: {0}")]
    AccessLog(#[from] crate::access_log::AccessLogError),

    #[error("User error: {0}")]
    User(#[from] crate::userdb::UserError),
}
