use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use super::errors::NotifyError;

/// How many delivery attempts the worker makes before dropping a
/// notification with an error log
const DELIVERY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DoorUnlock,
    BreakIn,
    ModelRetrain,
    FailedAttempt,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::DoorUnlock => "door_unlock",
            NotificationKind::BreakIn => "break_in",
            NotificationKind::ModelRetrain => "model_retrain",
            NotificationKind::FailedAttempt => "failed_attempt",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// The user this notification is about, when known
    pub user_id: Option<String>,
    pub message: String,
    /// Back-reference to the access log entry that produced this event
    pub log_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outbound delivery transport. Implementations must be idempotent-tolerant:
/// the worker retries on failure, so a recipient may see a message twice.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Delivers notifications as JSON POSTs to a webhook endpoint
pub struct HttpNotificationChannel {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl HttpNotificationChannel {
    pub fn new(endpoint: url::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl NotificationChannel for HttpNotificationChannel {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "Notification endpoint returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Handle for queueing notifications without blocking the caller.
///
/// Enqueueing never fails from the producer's point of view; delivery
/// happens on a background worker with bounded retries. Losing a
/// notification is logged, never propagated back into session handling.
#[derive(Clone)]
pub struct NotificationEmitter {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationEmitter {
    /// Spawn the delivery worker and return the producer handle
    pub fn start(channel: Arc<dyn NotificationChannel>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                deliver_with_retry(channel.as_ref(), &notification).await;
            }
        });

        Self { tx }
    }

    pub fn enqueue(&self, notification: Notification) {
        tracing::debug!(kind = %notification.kind, "Queueing notification");
        // A closed channel means the worker is gone; nothing to do but log
        if self.tx.send(notification).is_err() {
            tracing::error!("Notification worker has stopped; dropping notification");
        }
    }

    /// Emitter wired to an in-process receiver instead of a worker
    #[cfg(test)]
    pub(crate) fn for_tests() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

async fn deliver_with_retry(channel: &dyn NotificationChannel, notification: &Notification) {
    for attempt in 1..=DELIVERY_ATTEMPTS {
        match channel.deliver(notification).await {
            Ok(()) => {
                tracing::debug!(kind = %notification.kind, attempt, "Notification delivered");
                return;
            }
            Err(e) if attempt < DELIVERY_ATTEMPTS => {
                tracing::warn!(kind = %notification.kind, attempt, error = %e,
                    "Notification delivery failed, retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => {
                tracing::error!(kind = %notification.kind, error = %e,
                    "Notification delivery failed, giving up");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct RecordingChannel {
        fail_first: AtomicU32,
        delivered: Mutex<Vec<Notification>>,
    }

    impl RecordingChannel {
        fn new(fail_first: u32) -> Self {
            Self {
                fail_first: AtomicU32::new(fail_first),
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
            let remaining = self.fail_first.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_first.store(remaining - 1, Ordering::SeqCst);
                return Err(NotifyError::Delivery("transient".to_string()));
            }
            self.delivered.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn sample(kind: NotificationKind) -> Notification {
        Notification {
            kind,
            user_id: Some("user1".to_string()),
            message: "test message".to_string(),
            log_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_retries_transient_failure() {
        let channel = Arc::new(RecordingChannel::new(1));

        deliver_with_retry(channel.as_ref(), &sample(NotificationKind::DoorUnlock)).await;

        let delivered = channel.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1, "retry should eventually deliver");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_gives_up_after_bounded_attempts() {
        let channel = Arc::new(RecordingChannel::new(DELIVERY_ATTEMPTS));

        deliver_with_retry(channel.as_ref(), &sample(NotificationKind::BreakIn)).await;

        let delivered = channel.delivered.lock().unwrap();
        assert!(delivered.is_empty(), "exhausted retries must not deliver");
        assert_eq!(channel.fail_first.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_emitter_forwards_to_worker() {
        let channel = Arc::new(RecordingChannel::new(0));
        let emitter = NotificationEmitter::start(channel.clone());

        emitter.enqueue(sample(NotificationKind::FailedAttempt));

        // Give the worker a moment to drain the queue
        for _ in 0..50 {
            if !channel.delivered.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let delivered = channel.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, NotificationKind::FailedAttempt);
    }
}
