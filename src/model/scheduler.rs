use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::config::SYNC_INTERVAL_HOURS;
use super::errors::ModelError;
use super::sync::ModelSyncManager;

/// Drives periodic model synchronization, decoupled from the session state
/// machine.
///
/// A tick is skipped while a session is past `Idle` so a model is never
/// swapped underneath a face match in progress; the two only communicate
/// through the manager's loaded-model pointer.
pub struct SyncScheduler {
    manager: Arc<ModelSyncManager>,
    interval: Duration,
    is_session_idle: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl SyncScheduler {
    /// Scheduler on the configured interval (`EDGELOCK_SYNC_INTERVAL_HOURS`)
    pub fn new(
        manager: Arc<ModelSyncManager>,
        is_session_idle: Arc<dyn Fn() -> bool + Send + Sync>,
    ) -> Self {
        Self::with_interval(
            manager,
            Duration::from_secs(*SYNC_INTERVAL_HOURS * 3600),
            is_session_idle,
        )
    }

    pub fn with_interval(
        manager: Arc<ModelSyncManager>,
        interval: Duration,
        is_session_idle: Arc<dyn Fn() -> bool + Send + Sync>,
    ) -> Self {
        Self {
            manager,
            interval,
            is_session_idle,
        }
    }

    /// Run one pass now, then on every interval tick while idle
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run_once().await;

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a fresh interval fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !(self.is_session_idle)() {
                    tracing::debug!("Session in progress, skipping model sync tick");
                    continue;
                }
                self.run_once().await;
            }
        })
    }

    async fn run_once(&self) {
        match self.manager.check_for_update().await {
            Ok(outcome) => tracing::info!(?outcome, "Model sync pass completed"),
            Err(ModelError::Unreachable(msg)) => {
                tracing::warn!(%msg, "Cloud unreachable, keeping last verified model")
            }
            Err(ModelError::IntegrityMismatch { expected, computed }) => {
                tracing::error!(%expected, %computed, "Model download failed verification, retrying next interval")
            }
            Err(e) => tracing::error!(error = %e, "Model sync pass failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sync::tests::MockGateway;
    use crate::model::types::SyncOutcome;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn temp_model_dir() -> PathBuf {
        std::env::temp_dir().join(format!("edgelock-sched-test-{}", uuid::Uuid::new_v4()))
    }

    /// The scheduler performs a startup pass and then periodic passes.
    #[tokio::test(start_paused = true)]
    async fn test_scheduler_syncs_at_start_and_on_interval() {
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = Arc::new(ModelSyncManager::with_dir(gateway.clone(), temp_model_dir()));

        let handle = SyncScheduler::with_interval(
            manager.clone(),
            Duration::from_secs(3600),
            Arc::new(|| true),
        )
        .spawn();

        // Startup pass
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.current().is_some());

        // A new version appears; the next tick picks it up
        gateway.serve("v2", b"model two");
        tokio::time::sleep(Duration::from_secs(3601)).await;
        assert_eq!(
            manager.current().map(|m| m.version_id.clone()),
            Some("v2".to_string())
        );

        handle.abort();
    }

    /// Ticks are skipped while a session is active; the model pointer is
    /// left alone until the device is idle again.
    #[tokio::test(start_paused = true)]
    async fn test_scheduler_skips_while_session_active() {
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = Arc::new(ModelSyncManager::with_dir(gateway.clone(), temp_model_dir()));
        manager
            .check_for_update()
            .await
            .expect("priming sync should succeed");
        assert_eq!(
            manager.check_for_update().await.expect("sync"),
            SyncOutcome::UpToDate
        );

        let idle = Arc::new(AtomicBool::new(false));
        let idle_probe = idle.clone();
        let handle = SyncScheduler::with_interval(
            manager.clone(),
            Duration::from_secs(3600),
            Arc::new(move || idle_probe.load(Ordering::Acquire)),
        )
        .spawn();

        // Session active across two ticks; v2 must not be installed.
        // (The startup pass runs regardless, matching sync-at-process-start;
        // it happens before any session can begin.)
        tokio::time::sleep(Duration::from_millis(50)).await;
        gateway.serve("v2", b"model two");
        tokio::time::sleep(Duration::from_secs(2 * 3600 + 10)).await;
        assert_eq!(
            manager.current().map(|m| m.version_id.clone()),
            Some("v1".to_string())
        );

        // Device idle again; the next tick converges.
        idle.store(true, Ordering::Release);
        tokio::time::sleep(Duration::from_secs(3600 + 10)).await;
        assert_eq!(
            manager.current().map(|m| m.version_id.clone()),
            Some("v2".to_string())
        );

        handle.abort();
    }
}
