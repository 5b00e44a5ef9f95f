mod errors;
mod main;
mod notify;
mod storage;
mod types;

pub use errors::{AccessLogError, NotifyError};
pub use main::AccessLogger;
pub use notify::{
    HttpNotificationChannel, Notification, NotificationChannel, NotificationEmitter,
    NotificationKind,
};
pub use types::{AccessLogEntry, AccessOutcome, FactorConfidences};

pub async fn init() -> Result<(), AccessLogError> {
    storage::AccessLogStore::init().await
}
