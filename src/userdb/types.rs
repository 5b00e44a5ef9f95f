use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Range of fingerprint template slots on the sensor module.
pub const FINGERPRINT_SLOT_MAX: i32 = 127;

/// Represents an enrolled person in the access control system
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    /// Database-assigned sequence number (primary key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<i64>,
    /// Unique user identifier
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// SHA-256 hex digest of the user's PIN
    pub pin_hash: String,
    /// Template slot on the fingerprint module (0-127), if enrolled
    pub fingerprint_slot: Option<i32>,
    /// Whether the user has administrator privileges
    pub is_admin: bool,
    /// Whether the user may authenticate; deactivated users are kept for
    /// access-log referential integrity
    pub is_active: bool,
    /// Notification channel bound via a linking challenge, set at most once
    pub notification_channel_id: Option<String>,
    /// Timestamp of the most recent successful unlock
    pub last_access: Option<DateTime<Utc>>,
    /// When the user was enrolled
    pub created_at: DateTime<Utc>,
    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with no fingerprint slot or linked channel
    pub fn new(user_id: String, name: String, email: String, pin_hash: String) -> Self {
        let now = Utc::now();
        Self {
            sequence_number: None,
            user_id,
            name,
            email,
            pin_hash,
            fingerprint_slot: None,
            is_admin: false,
            is_active: true,
            notification_channel_id: None,
            last_access: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user has admin privileges
    ///
    /// This is determined by either:
    /// 1. The user has is_admin flag set to true, or
    /// 2. The user is the first user in the system (sequence_number = 1)
    pub fn has_admin_privileges(&self) -> bool {
        self.is_admin || self.sequence_number == Some(1)
    }
}

/// Lookup key for [`UserStore::get_user_by`](super::UserStore::get_user_by)
#[derive(Debug, Clone, PartialEq)]
pub enum UserSearchField {
    Id(String),
    FingerprintSlot(i32),
    NotificationChannel(String),
}

impl std::fmt::Display for UserSearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserSearchField::Id(id) => write!(f, "id={id}"),
            UserSearchField::FingerprintSlot(slot) => write!(f, "fingerprint_slot={slot}"),
            UserSearchField::NotificationChannel(ch) => write!(f, "notification_channel={ch}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Test that a new user carries the expected defaults
    /// This test checks:
    /// 1. The user has the correct user_id, name, email and pin_hash
    /// 2. is_admin defaults to false and is_active to true
    /// 3. fingerprint_slot, notification_channel_id and last_access are unset
    /// 4. created_at and updated_at are set to the current time
    #[test]
    fn test_user_new() {
        let user = User::new(
            "user123".to_string(),
            "Test User".to_string(),
            "test@example.com".to_string(),
            crate::utils::hash_pin("1234"),
        );

        assert_eq!(user.user_id, "user123");
        assert_eq!(user.name, "Test User");
        assert_eq!(user.email, "test@example.com");
        assert!(!user.is_admin);
        assert!(user.is_active);
        assert_eq!(user.sequence_number, None);
        assert_eq!(user.fingerprint_slot, None);
        assert_eq!(user.notification_channel_id, None);
        assert_eq!(user.last_access, None);

        let one_second_ago = Utc::now() - Duration::seconds(1);
        assert!(user.created_at > one_second_ago);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_has_admin_privileges() {
        let mut user = User::new(
            "user123".to_string(),
            "Test User".to_string(),
            "test@example.com".to_string(),
            crate::utils::hash_pin("1234"),
        );
        assert!(!user.has_admin_privileges());

        user.is_admin = true;
        assert!(user.has_admin_privileges());

        user.is_admin = false;
        user.sequence_number = Some(1);
        assert!(user.has_admin_privileges());

        user.sequence_number = Some(2);
        assert!(!user.has_admin_privileges());
    }

    #[test]
    fn test_search_field_display() {
        assert_eq!(UserSearchField::Id("u1".into()).to_string(), "id=u1");
        assert_eq!(
            UserSearchField::FingerprintSlot(7).to_string(),
            "fingerprint_slot=7"
        );
        assert_eq!(
            UserSearchField::NotificationChannel("chat42".into()).to_string(),
            "notification_channel=chat42"
        );
    }
}
