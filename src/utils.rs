use ring::rand::SecureRandom;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Format error: {0}")]
    Format(String),
}

/// Generate a numeric code of the given length from a secure random source.
///
/// Used for linking-challenge codes; each digit is drawn independently so
/// leading zeros are possible and every code of the requested length is
/// equally likely.
pub(crate) fn gen_numeric_code(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random digits".to_string()))?;
    Ok(bytes.iter().map(|b| ((b % 10) + b'0') as char).collect())
}

/// SHA-256 digest of a byte slice, lowercase hex encoded.
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().fold(String::with_capacity(64), |mut out, b| {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Hash a PIN into the format stored in the user table (`pin_hash`).
pub fn hash_pin(pin: &str) -> String {
    sha256_hex(pin.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_gen_numeric_code_length_and_charset() {
        for len in [4, 6, 8] {
            let code = gen_numeric_code(len).expect("code generation should succeed");
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_gen_numeric_code_varies() {
        // 16-digit draws colliding would indicate a broken random source.
        let a = gen_numeric_code(16).expect("code generation should succeed");
        let b = gen_numeric_code(16).expect("code generation should succeed");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        // Standard SHA-256 vector for the empty input.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_pin_matches_sha256_of_string() {
        assert_eq!(hash_pin("1234"), sha256_hex(b"1234"));
        assert_eq!(hash_pin("1234").len(), 64);
    }

    proptest! {
        /// Hashing the same PIN is deterministic and distinct PINs collide
        /// with negligible probability at this sample size.
        #[test]
        fn prop_hash_pin_deterministic(pin in "[0-9]{4,8}") {
            prop_assert_eq!(hash_pin(&pin), hash_pin(&pin));
        }
    }
}
