mod errors;
mod storage;
mod types;

pub use errors::UserError;
pub use storage::UserStore;
pub use types::{FINGERPRINT_SLOT_MAX, User, UserSearchField};

pub async fn init() -> Result<(), UserError> {
    UserStore::init().await
}
