mod config;
mod coordinator;
mod errors;
mod types;

pub use config::SessionPolicy;
pub use coordinator::{AuthSessionCoordinator, SessionHandle};
pub use errors::SessionError;
pub use types::{SessionOutcome, SessionState, SessionStatus};
