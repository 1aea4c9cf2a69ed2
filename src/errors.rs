use crate::platform::PlatformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapsError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("A capability refresh is already running")]
    RefreshInProgress,
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
    #[error("Document store error: {0}")]
    Store(String),
    #[error("Sign-in error: {0}")]
    Auth(String),
    #[error("Integrity check error: {0}")]
    Integrity(String),
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
    #[error("Rate limited, retry in {0}s")]
    RateLimited(u64),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CapsError {
    pub fn store(message: impl Into<String>) -> Self {
        CapsError::Store(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        CapsError::Auth(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        CapsError::Config(message.into())
    }
}
