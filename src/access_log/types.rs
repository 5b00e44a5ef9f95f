use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal outcome of an authentication session, in the wire vocabulary
/// the backend and bot layer already speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    Success,
    FailedPin,
    FailedFace,
    FailedFingerprint,
    BreakInAttempt,
}

impl AccessOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Success => "success",
            AccessOutcome::FailedPin => "failed_password",
            AccessOutcome::FailedFace => "failed_face",
            AccessOutcome::FailedFingerprint => "failed_fingerprint",
            AccessOutcome::BreakInAttempt => "break_in_attempt",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "success" => Some(AccessOutcome::Success),
            "failed_password" => Some(AccessOutcome::FailedPin),
            "failed_face" => Some(AccessOutcome::FailedFace),
            "failed_fingerprint" => Some(AccessOutcome::FailedFingerprint),
            "break_in_attempt" => Some(AccessOutcome::BreakInAttempt),
            _ => None,
        }
    }

    /// Whether this outcome counts as a failed attempt for escalation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AccessOutcome::FailedPin | AccessOutcome::FailedFace | AccessOutcome::FailedFingerprint
        )
    }
}

impl std::fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-factor confidence scores recorded with every entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FactorConfidences {
    pub pin: Option<f64>,
    pub face: Option<f64>,
    pub fingerprint: Option<f64>,
}

/// Append-only record of one terminal session outcome; never mutated or
/// deleted
#[derive(Debug, Clone, PartialEq)]
pub struct AccessLogEntry {
    pub log_id: String,
    /// None when the subject could not be identified
    pub user_id: Option<String>,
    pub outcome: AccessOutcome,
    pub confidences: FactorConfidences,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AccessLogEntry {
    pub fn new(
        outcome: AccessOutcome,
        user_id: Option<String>,
        confidences: FactorConfidences,
        notes: Option<String>,
    ) -> Self {
        Self {
            log_id: uuid::Uuid::new_v4().to_string(),
            user_id,
            outcome,
            confidences,
            notes,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_names_roundtrip() {
        for outcome in [
            AccessOutcome::Success,
            AccessOutcome::FailedPin,
            AccessOutcome::FailedFace,
            AccessOutcome::FailedFingerprint,
            AccessOutcome::BreakInAttempt,
        ] {
            assert_eq!(AccessOutcome::from_str_opt(outcome.as_str()), Some(outcome));
        }
        assert_eq!(AccessOutcome::FailedPin.as_str(), "failed_password");
        assert_eq!(AccessOutcome::from_str_opt("unknown"), None);
    }

    #[test]
    fn test_failure_classification() {
        assert!(AccessOutcome::FailedPin.is_failure());
        assert!(AccessOutcome::FailedFace.is_failure());
        assert!(!AccessOutcome::Success.is_failure());
        assert!(!AccessOutcome::BreakInAttempt.is_failure());
    }

    #[test]
    fn test_new_entry_gets_id_and_timestamp() {
        let entry = AccessLogEntry::new(
            AccessOutcome::Success,
            Some("user1".to_string()),
            FactorConfidences {
                pin: Some(1.0),
                face: Some(0.92),
                fingerprint: Some(0.88),
            },
            None,
        );
        assert!(!entry.log_id.is_empty());
        assert!(entry.timestamp <= Utc::now());
    }
}
