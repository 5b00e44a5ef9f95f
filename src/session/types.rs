use std::time::Duration;

use serde::Serialize;

/// Where a session currently is in the factor pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    PinEntry,
    FaceScan,
    FingerprintScan,
    RemoteVerify,
    LocalFallbackVerify,
    Unlocked,
    Denied,
    Lockout,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::PinEntry => "pin_entry",
            SessionState::FaceScan => "face_scan",
            SessionState::FingerprintScan => "fingerprint_scan",
            SessionState::RemoteVerify => "remote_verify",
            SessionState::LocalFallbackVerify => "local_fallback_verify",
            SessionState::Unlocked => "unlocked",
            SessionState::Denied => "denied",
            SessionState::Lockout => "lockout",
        };
        write!(f, "{s}")
    }
}

/// Terminal result handed to the operator surface. Deliberately coarse:
/// which factor failed is recorded in the access log, never shown at the
/// door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Unlocked,
    Denied,
    Lockout,
}

/// Non-blocking snapshot of a running (or idle) coordinator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Time since the session claim, zero when idle
    pub elapsed: Duration,
}
