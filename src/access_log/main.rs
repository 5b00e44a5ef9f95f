use chrono::{Duration, Utc};

use crate::userdb::UserStore;

use super::errors::AccessLogError;
use super::notify::{Notification, NotificationEmitter, NotificationKind};
use super::storage::AccessLogStore;
use super::types::{AccessLogEntry, AccessOutcome, FactorConfidences};

/// Window over which failed attempts are counted for escalating messages
const FAILURE_WINDOW_MINS: i64 = 60;

/// Records terminal session outcomes and fans them out as notifications.
///
/// The log write always completes before the notification is queued, so a
/// delivered message always refers to a persisted entry.
#[derive(Clone)]
pub struct AccessLogger {
    emitter: NotificationEmitter,
}

impl AccessLogger {
    pub fn new(emitter: NotificationEmitter) -> Self {
        Self { emitter }
    }

    /// Persist one outcome and queue the matching notification.
    /// Returns the log id of the stored entry.
    #[tracing::instrument(skip(self, confidences, notes), fields(outcome = %outcome))]
    pub async fn record(
        &self,
        outcome: AccessOutcome,
        user_id: Option<String>,
        confidences: FactorConfidences,
        notes: Option<String>,
    ) -> Result<String, AccessLogError> {
        let entry = AccessLogEntry::new(outcome, user_id, confidences, notes);
        AccessLogStore::append(&entry).await?;

        let notification = self.build_notification(&entry).await?;
        self.emitter.enqueue(notification);

        Ok(entry.log_id)
    }

    /// Most recent entries, newest first
    pub async fn recent_entries(&self, limit: i64) -> Result<Vec<AccessLogEntry>, AccessLogError> {
        AccessLogStore::get_recent(limit).await
    }

    /// Failed attempts within the escalation window ending now
    pub async fn recent_failure_count(&self) -> Result<i64, AccessLogError> {
        let since = Utc::now() - Duration::minutes(FAILURE_WINDOW_MINS);
        AccessLogStore::count_failures_since(since).await
    }

    async fn build_notification(
        &self,
        entry: &AccessLogEntry,
    ) -> Result<Notification, AccessLogError> {
        let (kind, message) = match entry.outcome {
            AccessOutcome::Success => {
                let name = match &entry.user_id {
                    Some(id) => UserStore::get_user(id)
                        .await?
                        .map(|u| u.name)
                        .unwrap_or_else(|| id.clone()),
                    None => "unknown user".to_string(),
                };
                (
                    NotificationKind::DoorUnlock,
                    format!("Door unlocked by {name}"),
                )
            }
            AccessOutcome::BreakInAttempt => (
                NotificationKind::BreakIn,
                "BREAK-IN ATTEMPT: repeated failed access, door locked out".to_string(),
            ),
            AccessOutcome::FailedPin
            | AccessOutcome::FailedFace
            | AccessOutcome::FailedFingerprint => {
                let count = self.recent_failure_count().await?;
                let message = if count > 3 {
                    format!(
                        "Failed access attempt ({}); {count} failures in the last hour",
                        entry.outcome
                    )
                } else {
                    format!("Failed access attempt ({})", entry.outcome)
                };
                (NotificationKind::FailedAttempt, message)
            }
        };

        Ok(Notification {
            kind,
            user_id: entry.user_id.clone(),
            message,
            log_id: Some(entry.log_id.clone()),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::test_utils::init_test_environment;
    use crate::userdb::User;

    fn logger_with_probe() -> (AccessLogger, tokio::sync::mpsc::UnboundedReceiver<Notification>)
    {
        let (emitter, rx) = NotificationEmitter::for_tests();
        (AccessLogger::new(emitter), rx)
    }

    fn confidences() -> FactorConfidences {
        FactorConfidences {
            pin: Some(1.0),
            face: Some(0.91),
            fingerprint: Some(0.87),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_record_persists_then_notifies() {
        init_test_environment().await;

        let user_id = format!("log-user-{}", uuid::Uuid::new_v4());
        UserStore::upsert_user(User::new(
            user_id.clone(),
            "Alice Door".to_string(),
            "alice@example.com".to_string(),
            crate::utils::hash_pin("1234"),
        ))
        .await
        .expect("user upsert should succeed");

        let (logger, mut rx) = logger_with_probe();
        let log_id = logger
            .record(
                AccessOutcome::Success,
                Some(user_id.clone()),
                confidences(),
                None,
            )
            .await
            .expect("record should succeed");

        // The entry is persisted before the notification is observable
        let recent = logger.recent_entries(10).await.expect("read back");
        assert!(recent.iter().any(|e| e.log_id == log_id));

        let notification = rx.recv().await.expect("a notification should be queued");
        assert_eq!(notification.kind, NotificationKind::DoorUnlock);
        assert_eq!(notification.log_id.as_deref(), Some(log_id.as_str()));
        assert!(notification.message.contains("Alice Door"));
    }

    #[tokio::test]
    #[serial]
    async fn test_break_in_maps_to_break_in_notification() {
        init_test_environment().await;

        let (logger, mut rx) = logger_with_probe();
        logger
            .record(
                AccessOutcome::BreakInAttempt,
                None,
                FactorConfidences::default(),
                Some("lockout after repeated failures".to_string()),
            )
            .await
            .expect("record should succeed");

        let notification = rx.recv().await.expect("a notification should be queued");
        assert_eq!(notification.kind, NotificationKind::BreakIn);
        assert!(notification.user_id.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_failed_attempts_counted_in_window() {
        init_test_environment().await;

        let (logger, mut rx) = logger_with_probe();
        let before = logger.recent_failure_count().await.expect("count");

        logger
            .record(
                AccessOutcome::FailedPin,
                None,
                FactorConfidences::default(),
                None,
            )
            .await
            .expect("record should succeed");
        logger
            .record(
                AccessOutcome::FailedFace,
                None,
                FactorConfidences::default(),
                None,
            )
            .await
            .expect("record should succeed");

        let after = logger.recent_failure_count().await.expect("count");
        assert_eq!(after, before + 2);

        let first = rx.recv().await.expect("queued");
        assert_eq!(first.kind, NotificationKind::FailedAttempt);
        assert!(first.message.contains("failed_password"));
    }

    #[tokio::test]
    #[serial]
    async fn test_success_does_not_count_as_failure() {
        init_test_environment().await;

        let (logger, _rx) = logger_with_probe();
        let before = logger.recent_failure_count().await.expect("count");

        logger
            .record(
                AccessOutcome::Success,
                None,
                confidences(),
                None,
            )
            .await
            .expect("record should succeed");

        let after = logger.recent_failure_count().await.expect("count");
        assert_eq!(after, before);
    }
}
