use std::error::Error;
use thiserror::Error;

/// Result alias for content-source operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by content sources regardless of the underlying backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("content source unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Construct an unavailable error that has no underlying cause.
    pub fn not_configured(message: impl Into<String>) -> Self {
        StorageError::Unavailable {
            message: message.into(),
            source: None,
        }
    }
}
