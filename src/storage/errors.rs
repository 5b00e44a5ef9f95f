use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Storage(err.to_string())
    }
}
