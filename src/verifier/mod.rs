mod errors;
mod face;
mod fingerprint;
mod pin;
mod types;

pub use errors::VerifierError;
pub use face::FaceVerifier;
pub use fingerprint::FingerprintVerifier;
pub use pin::PinVerifier;
pub use types::{
    FaceCamera, FaceObservation, FactorVerifier, FingerprintReading, FingerprintScanner,
    MatchResult, PinPad,
};
