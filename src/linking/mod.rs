mod config;
mod errors;
mod main;
mod storage;
mod types;

pub use errors::LinkingError;
pub use main::{claim_challenge, issue_challenge};
pub use types::{ClaimedLink, LinkingChallenge};

pub async fn init() -> Result<(), LinkingError> {
    storage::ChallengeStore::init().await
}
