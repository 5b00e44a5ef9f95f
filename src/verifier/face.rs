use std::sync::Arc;

use async_trait::async_trait;

use crate::model::ModelSyncManager;
use crate::userdb::UserStore;

use super::errors::VerifierError;
use super::types::{FaceCamera, FactorVerifier, MatchResult};

/// Face recognition against the currently loaded model.
///
/// Without a loaded model the factor is denied rather than errored: the
/// device stays usable and the session simply fails this step.
pub struct FaceVerifier {
    camera: Arc<dyn FaceCamera>,
    models: Arc<ModelSyncManager>,
    min_confidence: f64,
}

impl FaceVerifier {
    pub fn new(camera: Arc<dyn FaceCamera>, models: Arc<ModelSyncManager>, min_confidence: f64) -> Self {
        Self {
            camera,
            models,
            min_confidence,
        }
    }
}

#[async_trait]
impl FactorVerifier for FaceVerifier {
    async fn verify(&self) -> Result<MatchResult, VerifierError> {
        let Some(model) = self.models.current() else {
            tracing::warn!("No face model loaded; denying face factor");
            return Ok(MatchResult::rejected(0.0));
        };

        let observation = self.camera.capture(&model).await?;

        let Some(candidate) = observation.user_id else {
            return Ok(MatchResult::rejected(observation.confidence));
        };

        if observation.confidence < self.min_confidence {
            return Err(VerifierError::LowConfidence {
                confidence: observation.confidence,
            });
        }

        // The model may lag the user table; only active users can pass
        match UserStore::get_user(&candidate).await? {
            Some(user) if user.is_active => Ok(MatchResult {
                matched: true,
                confidence: observation.confidence,
                user_id: Some(user.user_id),
            }),
            _ => {
                tracing::warn!(user_id = %candidate, "Face match for unknown or inactive user");
                Ok(MatchResult::rejected(observation.confidence))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::model::{MockGateway, SyncOutcome};
    use crate::test_utils::init_test_environment;
    use crate::userdb::User;
    use crate::utils::hash_pin;
    use crate::verifier::types::FaceObservation;

    struct ScriptedCamera(FaceObservation);

    #[async_trait]
    impl FaceCamera for ScriptedCamera {
        async fn capture(
            &self,
            _model: &crate::model::LoadedModel,
        ) -> Result<FaceObservation, VerifierError> {
            Ok(self.0.clone())
        }
    }

    async fn models_with_installed() -> Arc<ModelSyncManager> {
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v20250101_000000", b"face model bytes");
        let dir = std::env::temp_dir().join(format!("edgelock-face-test-{}", uuid::Uuid::new_v4()));
        let manager = Arc::new(ModelSyncManager::with_dir(gateway, dir));
        assert!(matches!(
            manager.check_for_update().await.expect("sync should succeed"),
            SyncOutcome::Installed { .. }
        ));
        manager
    }

    async fn seed_user() -> String {
        let user_id = format!("face-user-{}", uuid::Uuid::new_v4());
        UserStore::upsert_user(User::new(
            user_id.clone(),
            "Face Tester".to_string(),
            "face@example.com".to_string(),
            hash_pin("1234"),
        ))
        .await
        .expect("user upsert should succeed");
        user_id
    }

    #[tokio::test]
    #[serial]
    async fn test_confident_match_of_active_user_passes() {
        init_test_environment().await;

        let user_id = seed_user().await;
        let camera = Arc::new(ScriptedCamera(FaceObservation {
            user_id: Some(user_id.clone()),
            confidence: 0.95,
        }));
        let verifier = FaceVerifier::new(camera, models_with_installed().await, 0.8);

        let result = verifier.verify().await.expect("verify should succeed");
        assert!(result.matched);
        assert_eq!(result.user_id.as_deref(), Some(user_id.as_str()));
    }

    #[tokio::test]
    #[serial]
    async fn test_low_confidence_match_is_refused() {
        init_test_environment().await;

        let user_id = seed_user().await;
        let camera = Arc::new(ScriptedCamera(FaceObservation {
            user_id: Some(user_id),
            confidence: 0.42,
        }));
        let verifier = FaceVerifier::new(camera, models_with_installed().await, 0.8);

        let result = verifier.verify().await;
        assert!(matches!(
            result,
            Err(VerifierError::LowConfidence { confidence }) if confidence == 0.42
        ));
    }

    #[tokio::test]
    #[serial]
    async fn test_no_model_denies_factor_without_error() {
        init_test_environment().await;

        let gateway = Arc::new(MockGateway::new());
        let dir = std::env::temp_dir().join(format!("edgelock-face-test-{}", uuid::Uuid::new_v4()));
        let models = Arc::new(ModelSyncManager::with_dir(gateway, dir));

        let camera = Arc::new(ScriptedCamera(FaceObservation {
            user_id: Some("anyone".to_string()),
            confidence: 0.99,
        }));
        let verifier = FaceVerifier::new(camera, models, 0.8);

        let result = verifier.verify().await.expect("verify should succeed");
        assert!(!result.matched);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    #[serial]
    async fn test_unknown_candidate_is_rejected() {
        init_test_environment().await;

        let camera = Arc::new(ScriptedCamera(FaceObservation {
            user_id: Some(format!("ghost-{}", uuid::Uuid::new_v4())),
            confidence: 0.93,
        }));
        let verifier = FaceVerifier::new(camera, models_with_installed().await, 0.8);

        let result = verifier.verify().await.expect("verify should succeed");
        assert!(!result.matched);
    }
}
