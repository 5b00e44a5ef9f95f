use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::gateway::CloudGateway;
use crate::utils::sha256_hex;

use super::config::{MODEL_DIR, MODEL_STAGING_FILE, MODEL_STATE_FILE};
use super::errors::ModelError;
use super::types::{LoadedModel, PersistedModelState, SyncOutcome};

/// Keeps the edge device's recognition model converged on the cloud's
/// single active version.
///
/// The loaded model is held behind a swap-not-mutate pointer: readers clone
/// an `Arc` and never observe a half-written artifact, and installation
/// replaces the pointer only after the staged download has been
/// hash-verified and atomically renamed into place.
pub struct ModelSyncManager {
    gateway: Arc<dyn CloudGateway>,
    model_dir: PathBuf,
    loaded: RwLock<Option<Arc<LoadedModel>>>,
}

impl ModelSyncManager {
    /// Manager over the configured model directory (`EDGELOCK_MODEL_DIR`)
    pub fn new(gateway: Arc<dyn CloudGateway>) -> Self {
        Self::with_dir(gateway, MODEL_DIR.as_str())
    }

    pub fn with_dir(gateway: Arc<dyn CloudGateway>, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            gateway,
            model_dir: model_dir.into(),
            loaded: RwLock::new(None),
        }
    }

    /// The currently loaded model, if any
    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        match self.loaded.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Content hash of the currently loaded model
    pub fn current_hash(&self) -> Option<String> {
        self.current().map(|m| m.content_hash.clone())
    }

    fn install(&self, model: LoadedModel) -> Option<Arc<LoadedModel>> {
        let model = Arc::new(model);
        let mut guard = match self.loaded.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.replace(model)
    }

    fn state_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_STATE_FILE)
    }

    /// Re-load the cached artifact persisted by a previous run.
    ///
    /// The sidecar's hash is recomputed against the artifact on disk, so a
    /// partial write from a crash is detected and discarded rather than
    /// served to the face verifier. Returns whether a model was installed.
    #[tracing::instrument(skip(self))]
    pub async fn load_cached(&self) -> Result<bool, ModelError> {
        let state_path = self.state_path();
        let raw = match tokio::fs::read(&state_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No cached model state, starting cold");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let state: PersistedModelState = match serde_json::from_slice(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "Cached model state unreadable, discarding");
                let _ = tokio::fs::remove_file(&state_path).await;
                return Ok(false);
            }
        };

        let artifact_path = self.model_dir.join(&state.artifact_file);
        let bytes = match tokio::fs::read(&artifact_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Cached model artifact missing, discarding state");
                let _ = tokio::fs::remove_file(&state_path).await;
                return Ok(false);
            }
        };

        let computed = sha256_hex(&bytes);
        if computed != state.content_hash {
            tracing::warn!(
                expected = %state.content_hash,
                computed = %computed,
                "Cached model artifact failed verification, discarding"
            );
            let _ = tokio::fs::remove_file(&artifact_path).await;
            let _ = tokio::fs::remove_file(&state_path).await;
            return Ok(false);
        }

        self.install(LoadedModel {
            version_id: state.version_id,
            content_hash: state.content_hash,
            artifact_path,
        });
        tracing::info!("Cached model verified and loaded");
        Ok(true)
    }

    /// One synchronization pass against the cloud's active version.
    ///
    /// `Unreachable` is non-fatal for callers: the previously loaded model
    /// stays active. An `IntegrityMismatch` discards the download and also
    /// keeps the previous model; the next scheduled pass retries.
    #[tracing::instrument(skip(self))]
    pub async fn check_for_update(&self) -> Result<SyncOutcome, ModelError> {
        let descriptor = match self.gateway.fetch_model_descriptor().await? {
            Some(descriptor) => descriptor,
            None => {
                tracing::info!("Cloud reports no trained model yet");
                return Ok(SyncOutcome::NoActiveModel);
            }
        };

        if self.current_hash().as_deref() == Some(descriptor.content_hash.as_str()) {
            tracing::debug!("Loaded model already matches the active version");
            return Ok(SyncOutcome::UpToDate);
        }

        let bytes = self.gateway.download_artifact(&descriptor.source_uri).await?;
        let computed = sha256_hex(&bytes);
        if computed != descriptor.content_hash {
            return Err(ModelError::IntegrityMismatch {
                expected: descriptor.content_hash,
                computed,
            });
        }

        tokio::fs::create_dir_all(&self.model_dir).await?;

        // Stage, then rename: the final artifact path never holds partial data
        let staging_path = self.model_dir.join(MODEL_STAGING_FILE);
        let artifact_file = format!("model-{}.bin", &descriptor.content_hash[..16.min(descriptor.content_hash.len())]);
        let artifact_path = self.model_dir.join(&artifact_file);
        tokio::fs::write(&staging_path, &bytes).await?;
        tokio::fs::rename(&staging_path, &artifact_path).await?;

        self.persist_state(&PersistedModelState {
            version_id: descriptor.version_id.clone(),
            content_hash: descriptor.content_hash.clone(),
            artifact_file,
        })
        .await?;

        let previous = self.install(LoadedModel {
            version_id: descriptor.version_id.clone(),
            content_hash: descriptor.content_hash,
            artifact_path: artifact_path.clone(),
        });

        // Reclaim the superseded artifact only after the swap
        if let Some(previous) = previous {
            if previous.artifact_path != artifact_path {
                let _ = tokio::fs::remove_file(&previous.artifact_path).await;
            }
        }

        tracing::info!(version_id = %descriptor.version_id, "New model installed");
        Ok(SyncOutcome::Installed {
            version_id: descriptor.version_id,
        })
    }

    async fn persist_state(&self, state: &PersistedModelState) -> Result<(), ModelError> {
        let tmp_path = self.model_dir.join(format!("{MODEL_STATE_FILE}.tmp"));
        let payload = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&tmp_path, payload).await?;
        tokio::fs::rename(&tmp_path, self.state_path()).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ModelSyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSyncManager")
            .field("model_dir", &self.model_dir)
            .field("loaded", &self.current_hash())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gateway::{
        GatewayError, ModelDescriptor, RemoteVerifyDecision, RemoteVerifyRequest,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scriptable gateway for sync tests
    pub(crate) struct MockGateway {
        pub descriptor: Mutex<Option<ModelDescriptor>>,
        pub artifact: Mutex<Vec<u8>>,
        pub unreachable: Mutex<bool>,
    }

    impl MockGateway {
        pub(crate) fn new() -> Self {
            Self {
                descriptor: Mutex::new(None),
                artifact: Mutex::new(Vec::new()),
                unreachable: Mutex::new(false),
            }
        }

        pub(crate) fn serve(&self, version_id: &str, bytes: &[u8]) {
            let hash = sha256_hex(bytes);
            *self.descriptor.lock().expect("lock") = Some(ModelDescriptor {
                version_id: version_id.to_string(),
                content_hash: hash,
                source_uri: format!("https://cloud.example.com/models/{version_id}.bin"),
            });
            *self.artifact.lock().expect("lock") = bytes.to_vec();
        }

        /// Advertise a hash that the served bytes will not match
        pub(crate) fn serve_tampered(&self, version_id: &str, bytes: &[u8]) {
            self.serve(version_id, bytes);
            let mut guard = self.descriptor.lock().expect("lock");
            if let Some(descriptor) = guard.as_mut() {
                descriptor.content_hash = "0".repeat(64);
            }
        }
    }

    #[async_trait]
    impl CloudGateway for MockGateway {
        async fn fetch_model_descriptor(&self) -> Result<Option<ModelDescriptor>, GatewayError> {
            if *self.unreachable.lock().expect("lock") {
                return Err(GatewayError::Unreachable("mock offline".to_string()));
            }
            Ok(self.descriptor.lock().expect("lock").clone())
        }

        async fn download_artifact(&self, _uri: &str) -> Result<Vec<u8>, GatewayError> {
            if *self.unreachable.lock().expect("lock") {
                return Err(GatewayError::Unreachable("mock offline".to_string()));
            }
            Ok(self.artifact.lock().expect("lock").clone())
        }

        async fn remote_verify(
            &self,
            _request: &RemoteVerifyRequest,
        ) -> Result<RemoteVerifyDecision, GatewayError> {
            if *self.unreachable.lock().expect("lock") {
                return Err(GatewayError::Unreachable("mock offline".to_string()));
            }
            Ok(RemoteVerifyDecision::Approved)
        }
    }

    fn temp_model_dir() -> PathBuf {
        std::env::temp_dir().join(format!("edgelock-model-test-{}", uuid::Uuid::new_v4()))
    }

    /// Cold start, install, then no-op when the hash is unchanged.
    #[tokio::test]
    async fn test_install_then_up_to_date() {
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = ModelSyncManager::with_dir(gateway.clone(), temp_model_dir());

        let outcome = manager.check_for_update().await.expect("sync should succeed");
        assert_eq!(
            outcome,
            SyncOutcome::Installed {
                version_id: "v1".to_string()
            }
        );
        assert_eq!(manager.current_hash(), Some(sha256_hex(b"model one")));

        let outcome = manager.check_for_update().await.expect("sync should succeed");
        assert_eq!(outcome, SyncOutcome::UpToDate);
    }

    /// No descriptor means no model yet; nothing is installed.
    #[tokio::test]
    async fn test_no_active_model() {
        let gateway = Arc::new(MockGateway::new());
        let manager = ModelSyncManager::with_dir(gateway, temp_model_dir());

        let outcome = manager.check_for_update().await.expect("sync should succeed");
        assert_eq!(outcome, SyncOutcome::NoActiveModel);
        assert!(manager.current().is_none());
    }

    /// A tampered download is rejected and the previous model survives.
    #[tokio::test]
    async fn test_integrity_mismatch_keeps_old_model() {
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = ModelSyncManager::with_dir(gateway.clone(), temp_model_dir());
        manager.check_for_update().await.expect("initial sync should succeed");
        let old_hash = manager.current_hash();

        gateway.serve_tampered("v2", b"model two");
        let result = manager.check_for_update().await;
        assert!(matches!(result, Err(ModelError::IntegrityMismatch { .. })));
        assert_eq!(manager.current_hash(), old_hash);
    }

    /// Unreachable gateway is reported as such and the loaded model stays.
    #[tokio::test]
    async fn test_unreachable_is_non_destructive() {
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = ModelSyncManager::with_dir(gateway.clone(), temp_model_dir());
        manager.check_for_update().await.expect("initial sync should succeed");

        *gateway.unreachable.lock().expect("lock") = true;
        let result = manager.check_for_update().await;
        assert!(matches!(result, Err(ModelError::Unreachable(_))));
        assert_eq!(manager.current_hash(), Some(sha256_hex(b"model one")));
    }

    /// A second manager over the same directory re-verifies and loads the
    /// cached artifact without any download (process restart path).
    #[tokio::test]
    async fn test_load_cached_after_restart() {
        let dir = temp_model_dir();
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = ModelSyncManager::with_dir(gateway.clone(), &dir);
        manager.check_for_update().await.expect("sync should succeed");

        let offline = Arc::new(MockGateway::new());
        *offline.unreachable.lock().expect("lock") = true;
        let restarted = ModelSyncManager::with_dir(offline, &dir);
        let loaded = restarted.load_cached().await.expect("load should succeed");
        assert!(loaded);
        assert_eq!(restarted.current_hash(), Some(sha256_hex(b"model one")));
    }

    /// A corrupted cached artifact is detected at startup and discarded.
    #[tokio::test]
    async fn test_load_cached_rejects_corruption() {
        let dir = temp_model_dir();
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = ModelSyncManager::with_dir(gateway, &dir);
        manager.check_for_update().await.expect("sync should succeed");
        let artifact_path = manager.current().expect("model loaded").artifact_path.clone();

        // Simulate a crash mid-write
        tokio::fs::write(&artifact_path, b"torn write")
            .await
            .expect("tampering should succeed");

        let restarted = ModelSyncManager::with_dir(Arc::new(MockGateway::new()), &dir);
        let loaded = restarted.load_cached().await.expect("load should succeed");
        assert!(!loaded);
        assert!(restarted.current().is_none());
    }

    /// Concurrent readers never observe a hash other than the pre-swap or
    /// post-swap value.
    #[tokio::test]
    async fn test_swap_is_atomic_for_readers() {
        let gateway = Arc::new(MockGateway::new());
        gateway.serve("v1", b"model one");
        let manager = Arc::new(ModelSyncManager::with_dir(gateway.clone(), temp_model_dir()));
        manager.check_for_update().await.expect("sync should succeed");

        let old_hash = sha256_hex(b"model one");
        let new_hash = sha256_hex(b"model two");

        let reader = {
            let manager = manager.clone();
            let old_hash = old_hash.clone();
            let new_hash = new_hash.clone();
            tokio::spawn(async move {
                loop {
                    match manager.current_hash() {
                        Some(hash) if hash == old_hash => {}
                        Some(hash) if hash == new_hash => return,
                        other => panic!("torn read: {other:?}"),
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        gateway.serve("v2", b"model two");
        manager.check_for_update().await.expect("second sync should succeed");

        tokio::time::timeout(std::time::Duration::from_secs(5), reader)
            .await
            .expect("reader should observe the new hash")
            .expect("reader should not panic");
    }
}
