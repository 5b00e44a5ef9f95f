use std::sync::Arc;

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use crate::userdb::UserStore;
use crate::utils::hash_pin;

use super::errors::VerifierError;
use super::types::{FactorVerifier, MatchResult, PinPad};

/// Checks an entered PIN against every active user's stored hash.
///
/// The comparison walks all users and uses a constant-time equality check
/// so neither the match position nor near-misses leak through timing.
pub struct PinVerifier {
    pad: Arc<dyn PinPad>,
}

impl PinVerifier {
    pub fn new(pad: Arc<dyn PinPad>) -> Self {
        Self { pad }
    }
}

#[async_trait]
impl FactorVerifier for PinVerifier {
    async fn verify(&self) -> Result<MatchResult, VerifierError> {
        let entered = self.pad.read_pin().await?;
        let entered_hash = hash_pin(&entered);

        let users = UserStore::get_all_active_users().await?;

        let mut matched_user: Option<String> = None;
        for user in &users {
            if bool::from(
                entered_hash
                    .as_bytes()
                    .ct_eq(user.pin_hash.as_bytes()),
            ) {
                matched_user = Some(user.user_id.clone());
            }
        }

        match matched_user {
            Some(user_id) => Ok(MatchResult {
                matched: true,
                confidence: 1.0,
                user_id: Some(user_id),
            }),
            None => Ok(MatchResult::rejected(0.0)),
        }
    }
}
