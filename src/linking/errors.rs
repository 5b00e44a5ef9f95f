use thiserror::Error;

use crate::userdb::UserError;

#[derive(Clone, Error, Debug)]
pub enum LinkingError {
    /// The code was already redeemed by a concurrent or earlier claim
    #[error("Challenge already claimed")]
    AlreadyClaimed,

    /// The code's TTL elapsed before the claim
    #[error("Challenge expired")]
    Expired,

    /// The notification channel is already bound to a different user, or the
    /// target user is already bound to a different channel
    #[error("Notification channel already in use")]
    ChannelInUse,

    /// No challenge exists for the presented code
    #[error("Challenge not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<UserError> for LinkingError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => LinkingError::NotFound,
            UserError::Storage(msg) => LinkingError::Storage(msg),
            UserError::InvalidData(msg) => LinkingError::Storage(msg),
        }
    }
}

impl From<crate::utils::UtilError> for LinkingError {
    fn from(err: crate::utils::UtilError) -> Self {
        LinkingError::Storage(err.to_string())
    }
}
