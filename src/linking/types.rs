use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A short-lived, single-use code binding a notification channel to a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct LinkingChallenge {
    /// Database-assigned sequence number (primary key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<i64>,
    /// Numeric code shown to the user
    pub code: String,
    /// The user this challenge was issued for
    pub user_id: String,
    /// When the challenge was issued
    pub issued_at: DateTime<Utc>,
    /// issued_at plus the configured TTL; the challenge is inert afterwards
    pub expires_at: DateTime<Utc>,
    /// Monotonic false-to-true; set by a successful claim
    pub claimed: bool,
}

impl LinkingChallenge {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Outcome of a successful claim
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedLink {
    pub user_id: String,
    pub channel_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let challenge = LinkingChallenge {
            sequence_number: None,
            code: "123456".to_string(),
            user_id: "user1".to_string(),
            issued_at: now,
            expires_at: now + Duration::minutes(10),
            claimed: false,
        };

        assert!(!challenge.is_expired_at(now));
        assert!(!challenge.is_expired_at(now + Duration::minutes(10) - Duration::seconds(1)));
        // Expiry instant itself counts as expired
        assert!(challenge.is_expired_at(now + Duration::minutes(10)));
        assert!(challenge.is_expired_at(now + Duration::minutes(11)));
    }
}
