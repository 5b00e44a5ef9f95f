//! edgelock - Multi-factor door access coordination for edge devices
//!
//! This crate coordinates the three authentication factors of a door unit
//! (PIN, face, fingerprint), keeps the on-device recognition model in sync
//! with a cloud gateway, links users to notification channels, and records
//! every terminal outcome in an append-only access log.

mod access_log;
mod gateway;
mod linking;
mod model;
mod session;
mod storage;
mod userdb;
mod utils;
mod verifier;

#[cfg(test)]
mod test_utils;

pub use access_log::{
    AccessLogError, AccessLogEntry, AccessLogger, AccessOutcome, FactorConfidences,
    HttpNotificationChannel, Notification, NotificationChannel, NotificationEmitter,
    NotificationKind, NotifyError,
};

pub use gateway::{
    CloudGateway, Factor, GatewayError, HttpCloudGateway, ModelDescriptor, RemoteVerifyDecision,
    RemoteVerifyRequest,
};

pub use linking::{ClaimedLink, LinkingChallenge, LinkingError, claim_challenge, issue_challenge};

pub use model::{
    LoadedModel, ModelError, ModelSyncManager, ModelTrainer, ModelVersion, RetrainCoordinator,
    SyncOutcome, SyncScheduler, TrainedArtifact,
};

pub use session::{
    AuthSessionCoordinator, SessionError, SessionHandle, SessionOutcome, SessionPolicy,
    SessionState, SessionStatus,
};

pub use userdb::{User, UserError, UserSearchField, UserStore};

pub use verifier::{
    FaceCamera, FaceObservation, FaceVerifier, FactorVerifier, FingerprintReading,
    FingerprintScanner, FingerprintVerifier, MatchResult, PinPad, PinVerifier, VerifierError,
};

pub use utils::hash_pin;

/// Initialize every store backing the coordination layer
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    storage::init().await?;
    userdb::init().await?;
    linking::init().await?;
    model::init().await?;
    access_log::init().await?;
    Ok(())
}
