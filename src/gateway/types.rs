use serde::{Deserialize, Serialize};

/// One authentication factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Pin,
    Face,
    Fingerprint,
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Factor::Pin => write!(f, "pin"),
            Factor::Face => write!(f, "face"),
            Factor::Fingerprint => write!(f, "fingerprint"),
        }
    }
}

/// The cloud's view of the single active recognition model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDescriptor {
    #[serde(rename = "model_version")]
    pub version_id: String,
    #[serde(rename = "model_hash")]
    pub content_hash: String,
    #[serde(rename = "model_url")]
    pub source_uri: String,
}

/// Locally collected factor results submitted for server-side re-validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteVerifyRequest {
    pub user_id: String,
    pub pin_verified: bool,
    pub face_confidence: f64,
    pub fingerprint_slot: Option<i32>,
    pub fingerprint_confidence: f64,
}

/// Server-side verdict over a [`RemoteVerifyRequest`]
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteVerifyDecision {
    Approved,
    /// The server disagreed with the named factor's local result
    Rejected { failed_factor: Factor },
}
