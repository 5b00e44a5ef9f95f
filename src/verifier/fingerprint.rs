use std::sync::Arc;

use async_trait::async_trait;

use crate::userdb::{UserSearchField, UserStore};

use super::errors::VerifierError;
use super::types::{FactorVerifier, FingerprintScanner, MatchResult};

/// Fingerprint check: the sensor decides accept/reject against its stored
/// templates, then the matched slot is resolved to an enrolled user.
pub struct FingerprintVerifier {
    scanner: Arc<dyn FingerprintScanner>,
}

impl FingerprintVerifier {
    pub fn new(scanner: Arc<dyn FingerprintScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl FactorVerifier for FingerprintVerifier {
    async fn verify(&self) -> Result<MatchResult, VerifierError> {
        let reading = self.scanner.scan().await?;

        if !reading.accepted {
            return Ok(MatchResult::rejected(reading.confidence));
        }

        match UserStore::get_user_by(UserSearchField::FingerprintSlot(reading.slot)).await? {
            Some(user) if user.is_active => Ok(MatchResult {
                matched: true,
                confidence: reading.confidence,
                user_id: Some(user.user_id),
            }),
            _ => {
                // A slot without a live owner means enrollment drifted
                tracing::warn!(slot = reading.slot, "Fingerprint slot has no active user");
                Ok(MatchResult::rejected(reading.confidence))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::test_utils::init_test_environment;
    use crate::userdb::User;
    use crate::utils::hash_pin;
    use crate::verifier::types::FingerprintReading;

    struct ScriptedScanner(FingerprintReading);

    #[async_trait]
    impl FingerprintScanner for ScriptedScanner {
        async fn scan(&self) -> Result<FingerprintReading, VerifierError> {
            Ok(self.0)
        }
    }

    async fn seed_user_with_slot(slot: i32) -> String {
        // Free the slot first; the backing file persists across tests
        if let Some(existing) = UserStore::get_user_by(UserSearchField::FingerprintSlot(slot))
            .await
            .expect("lookup should succeed")
        {
            let mut existing = existing;
            existing.fingerprint_slot = None;
            UserStore::upsert_user(existing)
                .await
                .expect("slot free should succeed");
        }

        let user_id = format!("fp-user-{}", uuid::Uuid::new_v4());
        let mut user = User::new(
            user_id.clone(),
            "Print Tester".to_string(),
            "fp@example.com".to_string(),
            hash_pin("1234"),
        );
        user.fingerprint_slot = Some(slot);
        UserStore::upsert_user(user)
            .await
            .expect("user upsert should succeed");
        user_id
    }

    #[tokio::test]
    #[serial]
    async fn test_accepted_reading_resolves_enrolled_user() {
        init_test_environment().await;

        let user_id = seed_user_with_slot(41).await;
        let verifier = FingerprintVerifier::new(Arc::new(ScriptedScanner(FingerprintReading {
            slot: 41,
            accepted: true,
            confidence: 0.9,
        })));

        let result = verifier.verify().await.expect("verify should succeed");
        assert!(result.matched);
        assert_eq!(result.user_id.as_deref(), Some(user_id.as_str()));
    }

    #[tokio::test]
    #[serial]
    async fn test_sensor_reject_is_a_rejection() {
        init_test_environment().await;

        seed_user_with_slot(42).await;
        let verifier = FingerprintVerifier::new(Arc::new(ScriptedScanner(FingerprintReading {
            slot: 42,
            accepted: false,
            confidence: 0.3,
        })));

        let result = verifier.verify().await.expect("verify should succeed");
        assert!(!result.matched);
        assert!(result.user_id.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_unowned_slot_is_rejected() {
        init_test_environment().await;

        // Slot 99 deliberately left without an owner
        if let Some(mut owner) = UserStore::get_user_by(UserSearchField::FingerprintSlot(99))
            .await
            .expect("lookup should succeed")
        {
            owner.fingerprint_slot = None;
            UserStore::upsert_user(owner)
                .await
                .expect("slot free should succeed");
        }

        let verifier = FingerprintVerifier::new(Arc::new(ScriptedScanner(FingerprintReading {
            slot: 99,
            accepted: true,
            confidence: 0.95,
        })));

        let result = verifier.verify().await.expect("verify should succeed");
        assert!(!result.matched);
    }

    #[tokio::test]
    #[serial]
    async fn test_deactivated_owner_is_rejected() {
        init_test_environment().await;

        let user_id = seed_user_with_slot(43).await;
        UserStore::deactivate_user(&user_id)
            .await
            .expect("deactivate should succeed");

        let verifier = FingerprintVerifier::new(Arc::new(ScriptedScanner(FingerprintReading {
            slot: 43,
            accepted: true,
            confidence: 0.9,
        })));

        let result = verifier.verify().await.expect("verify should succeed");
        assert!(!result.matched);
    }
}
