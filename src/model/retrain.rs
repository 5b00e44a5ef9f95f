use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::access_log::{Notification, NotificationEmitter, NotificationKind};
use crate::userdb::{User, UserStore};

use super::errors::ModelError;
use super::storage::ModelStore;
use super::types::ModelVersion;

/// Produces a trained model artifact from the current user set.
///
/// Actual training (image processing, encoding) lives outside this crate;
/// the coordinator only cares about the resulting artifact's identity.
#[async_trait]
pub trait ModelTrainer: Send + Sync {
    async fn train(&self, users: &[User]) -> Result<TrainedArtifact, ModelError>;
}

/// What a completed training run hands back
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedArtifact {
    /// SHA-256 hex digest of the produced artifact
    pub content_hash: String,
    /// Where edges will download the artifact from
    pub source_uri: String,
}

/// Serializes training/promotion so only one job is in flight system-wide.
///
/// Training consumes the full user set; an overlapping second run could
/// promote an inconsistent snapshot, so it is rejected rather than queued.
pub struct RetrainCoordinator {
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RetrainCoordinator {
    pub fn new() -> Self {
        Self {
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a training/promotion job is currently running
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Train a new model over all active users and promote it to the single
    /// active version.
    ///
    /// Fails with [`ModelError::AlreadyInProgress`] if another job holds the
    /// in-flight claim. The promotion retries once on a concurrent
    /// activation [`ModelError::Conflict`] with freshly read state.
    #[tracing::instrument(skip_all)]
    pub async fn retrain(
        &self,
        trainer: &dyn ModelTrainer,
        emitter: Option<&NotificationEmitter>,
    ) -> Result<ModelVersion, ModelError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Retrain requested while another job is running");
            return Err(ModelError::AlreadyInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let users = UserStore::get_all_active_users()
            .await
            .map_err(|e| ModelError::Storage(e.to_string()))?;
        tracing::info!(user_count = users.len(), "Starting model training");

        let artifact = trainer.train(&users).await?;

        let version = ModelVersion {
            sequence_number: None,
            version_id: format!("v{}", Utc::now().format("%Y%m%d_%H%M%S%3f")),
            content_hash: artifact.content_hash,
            source_uri: artifact.source_uri,
            trained_at: Utc::now(),
            user_count: users.len() as i64,
            is_active: false,
        };
        ModelStore::insert_version(&version).await?;

        // Promote; one retry with fresh state if another activation raced us
        for attempt in 0..2 {
            let expected = ModelStore::get_active().await?.map(|m| m.version_id);
            match ModelStore::compare_and_activate(&version.version_id, expected.as_deref()).await
            {
                Ok(()) => break,
                Err(ModelError::Conflict) if attempt == 0 => continue,
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            version_id = %version.version_id,
            user_count = version.user_count,
            "Model retrained and activated"
        );

        if let Some(emitter) = emitter {
            emitter.enqueue(Notification {
                kind: NotificationKind::ModelRetrain,
                user_id: None,
                message: format!(
                    "Face model retrained: {} ({} users)",
                    version.version_id, version.user_count
                ),
                log_id: None,
                created_at: Utc::now(),
            });
        }

        Ok(version)
    }
}

impl Default for RetrainCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
