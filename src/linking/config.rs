//! Linking-challenge configuration

use std::{env, sync::LazyLock};

/// Challenge lifetime in seconds
///
/// Default: 600 (10 minutes)
pub(crate) static LINK_TTL_SECS: LazyLock<i64> = LazyLock::new(|| {
    env::var("EDGELOCK_LINK_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(600)
});

/// Number of digits in a challenge code
///
/// Default: 6
pub(crate) static LINK_CODE_LENGTH: LazyLock<usize> = LazyLock::new(|| {
    env::var("EDGELOCK_LINK_CODE_LENGTH")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(6)
});

/// Draws attempted before giving up on finding a collision-free code
pub(crate) const CODE_DRAW_ATTEMPTS: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // The LazyLock may already be initialized from the environment;
        // exercise the same parsing logic against an unset variable.
        let ttl = env::var("EDGELOCK_LINK_TTL_SECS_UNSET_PROBE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(600);
        assert_eq!(ttl, 600);
        assert!(*LINK_CODE_LENGTH >= 4);
    }
}
