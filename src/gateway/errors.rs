use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum GatewayError {
    /// The cloud gateway cannot be contacted; callers degrade to their
    /// local fallback path instead of failing
    #[error("Cloud gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway answered with an unexpected HTTP status
    #[error("Cloud gateway returned status {0}")]
    Status(u16),

    /// The gateway answered but the payload could not be interpreted
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Gateway configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            GatewayError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::Status(status.as_u16())
        } else {
            GatewayError::InvalidResponse(err.to_string())
        }
    }
}
