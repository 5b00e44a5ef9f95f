use chrono::{Duration, Utc};

use crate::userdb::UserStore;
use crate::utils::gen_numeric_code;

use super::config::{CODE_DRAW_ATTEMPTS, LINK_CODE_LENGTH, LINK_TTL_SECS};
use super::errors::LinkingError;
use super::storage::ChallengeStore;
use super::types::{ClaimedLink, LinkingChallenge};

/// Issue a linking challenge for a user.
///
/// Any live challenge the user already holds is expired first so only the
/// newest code is redeemable. The code is drawn from a secure random source
/// and redrawn while it collides with another live, unclaimed challenge.
#[tracing::instrument(fields(user_id = %user_id))]
pub async fn issue_challenge(user_id: &str) -> Result<LinkingChallenge, LinkingError> {
    let user = UserStore::get_user(user_id)
        .await?
        .ok_or(LinkingError::NotFound)?;

    let now = Utc::now();
    let superseded = ChallengeStore::expire_for_user(&user.user_id, now).await?;
    if superseded > 0 {
        tracing::info!(superseded, "Expired earlier challenges for user");
    }

    for _ in 0..CODE_DRAW_ATTEMPTS {
        let code = gen_numeric_code(*LINK_CODE_LENGTH)?;
        if ChallengeStore::is_code_active(&code, now).await? {
            tracing::debug!("Challenge code collision, redrawing");
            continue;
        }

        let challenge = LinkingChallenge {
            sequence_number: None,
            code,
            user_id: user.user_id.clone(),
            issued_at: now,
            expires_at: now + Duration::seconds(*LINK_TTL_SECS),
            claimed: false,
        };
        ChallengeStore::insert(&challenge).await?;
        tracing::info!(expires_at = %challenge.expires_at, "Linking challenge issued");
        return Ok(challenge);
    }

    Err(LinkingError::Storage(
        "Could not draw a collision-free challenge code".to_string(),
    ))
}

/// Redeem a challenge code, binding `channel_id` to the challenge's user.
///
/// Atomic with respect to concurrent claims of the same code: exactly one
/// claim can succeed, later ones see [`LinkingError::AlreadyClaimed`].
pub async fn claim_challenge(code: &str, channel_id: &str) -> Result<ClaimedLink, LinkingError> {
    ChallengeStore::claim(code, channel_id, Utc::now()).await
}
