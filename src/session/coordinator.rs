use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::access_log::{AccessLogger, AccessOutcome, FactorConfidences};
use crate::gateway::{CloudGateway, Factor, RemoteVerifyDecision, RemoteVerifyRequest};
use crate::userdb::UserStore;
use crate::verifier::{FactorVerifier, MatchResult, VerifierError};

use super::config::SessionPolicy;
use super::errors::SessionError;
use super::types::{SessionOutcome, SessionState, SessionStatus};

/// State observable while a session runs. Shared between the coordinator
/// and the handle so an abandoned handle releases the claim on drop.
struct SessionShared {
    in_flight: AtomicBool,
    locked_out: AtomicBool,
    state: RwLock<SessionState>,
    started_at: RwLock<Option<Instant>>,
}

impl SessionShared {
    fn set_state(&self, state: SessionState) {
        tracing::debug!(%state, "Session state change");
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn release(&self) {
        self.set_state(SessionState::Idle);
        *self.started_at.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Proof of an exclusive session claim. Dropping it without running the
/// session returns the coordinator to idle.
#[must_use]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
    armed: bool,
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.armed {
            self.shared.release();
        }
    }
}

struct ReleaseGuard(Arc<SessionShared>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

enum StepVerdict {
    Passed(MatchResult),
    Exhausted { last_confidence: f64 },
}

/// Drives one physical door through the three-factor pipeline.
///
/// Exactly one session runs at a time; a second `start_session` while one
/// is in flight returns `Busy` rather than queueing. Every terminal state
/// writes exactly one access log entry before its notification goes out.
pub struct AuthSessionCoordinator {
    pin: Arc<dyn FactorVerifier>,
    face: Arc<dyn FactorVerifier>,
    fingerprint: Arc<dyn FactorVerifier>,
    gateway: Arc<dyn CloudGateway>,
    logger: AccessLogger,
    policy: SessionPolicy,
    shared: Arc<SessionShared>,
}

impl AuthSessionCoordinator {
    pub fn new(
        pin: Arc<dyn FactorVerifier>,
        face: Arc<dyn FactorVerifier>,
        fingerprint: Arc<dyn FactorVerifier>,
        gateway: Arc<dyn CloudGateway>,
        logger: AccessLogger,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            pin,
            face,
            fingerprint,
            gateway,
            logger,
            policy,
            shared: Arc::new(SessionShared {
                in_flight: AtomicBool::new(false),
                locked_out: AtomicBool::new(false),
                state: RwLock::new(SessionState::Idle),
                started_at: RwLock::new(None),
            }),
        }
    }

    /// Claim the single session slot. A fresh claim clears any lockout
    /// left by the previous session.
    pub fn start_session(&self) -> Result<SessionHandle, SessionError> {
        if self
            .shared
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(SessionError::Busy);
        }

        self.shared.locked_out.store(false, Ordering::Release);
        *self
            .shared
            .started_at
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        tracing::info!("Session claimed");

        Ok(SessionHandle {
            shared: self.shared.clone(),
            armed: true,
        })
    }

    /// Run the claimed session to a terminal state. Step-level trouble
    /// (timeouts, sensor noise, low confidence) is consumed as failed
    /// attempts; only infrastructure failures surface as errors.
    #[tracing::instrument(skip_all)]
    pub async fn run_session(
        &self,
        mut handle: SessionHandle,
    ) -> Result<SessionOutcome, SessionError> {
        handle.armed = false;
        drop(handle);
        let _guard = ReleaseGuard(self.shared.clone());

        let mut confidences = FactorConfidences::default();

        let pin = match self
            .run_step(
                Factor::Pin,
                self.pin.as_ref(),
                SessionState::PinEntry,
                self.policy.pin_timeout,
            )
            .await?
        {
            StepVerdict::Passed(result) => {
                confidences.pin = Some(result.confidence);
                result
            }
            StepVerdict::Exhausted { last_confidence } => {
                confidences.pin = Some(last_confidence);
                return self.finish_lockout(Factor::Pin, confidences).await;
            }
        };

        let face = match self
            .run_step(
                Factor::Face,
                self.face.as_ref(),
                SessionState::FaceScan,
                self.policy.face_timeout,
            )
            .await?
        {
            StepVerdict::Passed(result) => {
                confidences.face = Some(result.confidence);
                result
            }
            StepVerdict::Exhausted { last_confidence } => {
                confidences.face = Some(last_confidence);
                return self.finish_lockout(Factor::Face, confidences).await;
            }
        };

        let fingerprint = match self
            .run_step(
                Factor::Fingerprint,
                self.fingerprint.as_ref(),
                SessionState::FingerprintScan,
                self.policy.fingerprint_timeout,
            )
            .await?
        {
            StepVerdict::Passed(result) => {
                confidences.fingerprint = Some(result.confidence);
                result
            }
            StepVerdict::Exhausted { last_confidence } => {
                confidences.fingerprint = Some(last_confidence);
                return self.finish_lockout(Factor::Fingerprint, confidences).await;
            }
        };

        // All three factors must point at the same person
        if face.user_id != pin.user_id {
            return self
                .finish_denied(
                    AccessOutcome::FailedFace,
                    pin.user_id,
                    confidences,
                    Some("face identity disagrees with PIN identity".to_string()),
                )
                .await;
        }
        if fingerprint.user_id != pin.user_id {
            return self
                .finish_denied(
                    AccessOutcome::FailedFingerprint,
                    pin.user_id,
                    confidences,
                    Some("fingerprint identity disagrees with PIN identity".to_string()),
                )
                .await;
        }

        let Some(user_id) = pin.user_id else {
            // Unreachable through the verifiers, but never unlock on it
            return self
                .finish_denied(
                    AccessOutcome::FailedPin,
                    None,
                    confidences,
                    Some("matched factors carried no identity".to_string()),
                )
                .await;
        };

        self.shared.set_state(SessionState::RemoteVerify);

        let Some(user) = UserStore::get_user(&user_id).await? else {
            return self
                .finish_denied(
                    AccessOutcome::FailedPin,
                    Some(user_id),
                    confidences,
                    Some("user record disappeared mid-session".to_string()),
                )
                .await;
        };

        let request = RemoteVerifyRequest {
            user_id: user_id.clone(),
            pin_verified: true,
            face_confidence: confidences.face.unwrap_or(0.0),
            fingerprint_slot: user.fingerprint_slot,
            fingerprint_confidence: confidences.fingerprint.unwrap_or(0.0),
        };

        match self.gateway.remote_verify(&request).await {
            Ok(RemoteVerifyDecision::Approved) => {
                self.finish_unlocked(user_id, confidences, None).await
            }
            Ok(RemoteVerifyDecision::Rejected { failed_factor }) => {
                let outcome = match failed_factor {
                    Factor::Pin => AccessOutcome::FailedPin,
                    Factor::Face => AccessOutcome::FailedFace,
                    Factor::Fingerprint => AccessOutcome::FailedFingerprint,
                };
                self.finish_denied(
                    outcome,
                    Some(user_id),
                    confidences,
                    Some("rejected by remote verification".to_string()),
                )
                .await
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gateway unavailable, verifying locally");
                self.shared.set_state(SessionState::LocalFallbackVerify);

                // Same thresholds the remote check applies, from local data
                if confidences.face.unwrap_or(0.0) >= self.policy.min_face_confidence
                    && fingerprint.matched
                {
                    self.finish_unlocked(
                        user_id,
                        confidences,
                        Some("approved by local fallback verification".to_string()),
                    )
                    .await
                } else {
                    self.finish_denied(
                        AccessOutcome::FailedFace,
                        Some(user_id),
                        confidences,
                        Some("local fallback below thresholds".to_string()),
                    )
                    .await
                }
            }
        }
    }

    /// Point-in-time view for the operator surface; never blocks
    pub fn session_status(&self) -> SessionStatus {
        let state = *self.shared.state.read().unwrap_or_else(|e| e.into_inner());
        let elapsed = self
            .shared
            .started_at
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .map(|t| t.elapsed())
            .unwrap_or_default();
        SessionStatus { state, elapsed }
    }

    pub fn is_idle(&self) -> bool {
        !self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Whether the last session ended in lockout (cleared by the next claim)
    pub fn current_lockout_state(&self) -> bool {
        self.shared.locked_out.load(Ordering::Acquire)
    }

    /// Idle probe for the model sync scheduler
    pub fn idle_probe(&self) -> Arc<dyn Fn() -> bool + Send + Sync> {
        let shared = self.shared.clone();
        Arc::new(move || !shared.in_flight.load(Ordering::Acquire))
    }

    async fn run_step(
        &self,
        factor: Factor,
        verifier: &dyn FactorVerifier,
        state: SessionState,
        step_timeout: Duration,
    ) -> Result<StepVerdict, SessionError> {
        self.shared.set_state(state);

        let mut last_confidence = 0.0;
        for attempt in 1..=self.policy.max_attempts {
            match tokio::time::timeout(step_timeout, verifier.verify()).await {
                Err(_) => {
                    tracing::info!(%factor, attempt, "Factor step timed out");
                }
                Ok(Ok(result)) if result.matched => {
                    tracing::info!(%factor, attempt, confidence = result.confidence,
                        "Factor passed");
                    return Ok(StepVerdict::Passed(result));
                }
                Ok(Ok(result)) => {
                    last_confidence = result.confidence;
                    tracing::info!(%factor, attempt, confidence = result.confidence,
                        "Factor rejected");
                }
                Ok(Err(VerifierError::SensorTimeout)) => {
                    tracing::info!(%factor, attempt, "Sensor reported timeout");
                }
                Ok(Err(VerifierError::LowConfidence { confidence })) => {
                    last_confidence = confidence;
                    tracing::info!(%factor, attempt, confidence, "Confidence below minimum");
                }
                Ok(Err(VerifierError::Sensor(e))) => {
                    tracing::warn!(%factor, attempt, error = %e, "Sensor error during step");
                }
                Ok(Err(e @ VerifierError::User(_))) => return Err(e.into()),
            }
        }

        Ok(StepVerdict::Exhausted { last_confidence })
    }

    async fn finish_lockout(
        &self,
        factor: Factor,
        confidences: FactorConfidences,
    ) -> Result<SessionOutcome, SessionError> {
        self.shared.set_state(SessionState::Lockout);
        self.shared.locked_out.store(true, Ordering::Release);

        self.logger
            .record(
                AccessOutcome::BreakInAttempt,
                None,
                confidences,
                Some(format!(
                    "{} attempts exhausted at {factor} step",
                    self.policy.max_attempts
                )),
            )
            .await?;

        tracing::warn!(%factor, "Session locked out");
        Ok(SessionOutcome::Lockout)
    }

    async fn finish_denied(
        &self,
        outcome: AccessOutcome,
        user_id: Option<String>,
        confidences: FactorConfidences,
        notes: Option<String>,
    ) -> Result<SessionOutcome, SessionError> {
        self.shared.set_state(SessionState::Denied);
        self.logger
            .record(outcome, user_id, confidences, notes)
            .await?;
        Ok(SessionOutcome::Denied)
    }

    async fn finish_unlocked(
        &self,
        user_id: String,
        confidences: FactorConfidences,
        notes: Option<String>,
    ) -> Result<SessionOutcome, SessionError> {
        self.shared.set_state(SessionState::Unlocked);
        self.logger
            .record(
                AccessOutcome::Success,
                Some(user_id.clone()),
                confidences,
                notes,
            )
            .await?;
        UserStore::set_last_access(&user_id, Utc::now()).await?;

        tracing::info!(user_id = %user_id, "Door unlocked");
        Ok(SessionOutcome::Unlocked)
    }
}
