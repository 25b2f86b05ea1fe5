pub mod identity;
pub mod messages;
pub mod payment;
pub mod repository;
pub mod search;
pub mod storage;

/// Failures talking to the cinema backend REST API.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    RequestFailed(String),
    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Backend response could not be parsed: {0}")]
    ResponseParseFailed(String),
    #[error("Backend rejected the credentials")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Failures of the per-session key/value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Stored value is not valid: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
