use std::time::Duration;

/// Construction-time tuning for the session coordinator.
///
/// Defaults mirror the deployed door unit: 30 s to type a PIN, 15 s to
/// present a face, 10 s for a fingerprint, three attempts per step.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    pub max_attempts: u32,
    pub pin_timeout: Duration,
    pub face_timeout: Duration,
    pub fingerprint_timeout: Duration,
    pub min_face_confidence: f64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pin_timeout: Duration::from_secs(30),
            face_timeout: Duration::from_secs(15),
            fingerprint_timeout: Duration::from_secs(10),
            min_face_confidence: 0.8,
        }
    }
}

impl SessionPolicy {
    /// Defaults overridden by `EDGELOCK_*` environment variables where set
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_parse("EDGELOCK_MAX_ATTEMPTS", defaults.max_attempts),
            pin_timeout: Duration::from_secs(env_parse(
                "EDGELOCK_PIN_TIMEOUT_SECS",
                defaults.pin_timeout.as_secs(),
            )),
            face_timeout: Duration::from_secs(env_parse(
                "EDGELOCK_FACE_TIMEOUT_SECS",
                defaults.face_timeout.as_secs(),
            )),
            fingerprint_timeout: Duration::from_secs(env_parse(
                "EDGELOCK_FINGERPRINT_TIMEOUT_SECS",
                defaults.fingerprint_timeout.as_secs(),
            )),
            min_face_confidence: env_parse(
                "EDGELOCK_MIN_FACE_CONFIDENCE",
                defaults.min_face_confidence,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
