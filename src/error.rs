//! Error types shared by the ports and the application services.

use crate::domain::{ResourceId, ResourceType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("No reply to request {0} before the timeout")]
    Timeout(String),

    #[error("Channel closed: {0}")]
    Closed(String),

    #[error("Messaging backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to read users file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed users file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Everything a static-resource operation can fail with.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Content type '{actual}' does not match declared type {declared}")]
    ContentTypeMismatch {
        declared: ResourceType,
        actual: String,
    },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    Forbidden,

    #[error("Static resource {0} not found")]
    NotFound(ResourceId),

    #[error("Static resource {0} was modified concurrently")]
    Conflict(ResourceId),

    #[error("Static resource {0} delete failed")]
    DeleteFailed(ResourceId),

    #[error(transparent)]
    Storage(#[from] BlobError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ResourceError {
    /// Errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ResourceError::EmptyFile
                | ResourceError::ContentTypeMismatch { .. }
                | ResourceError::InvalidUpload(_)
                | ResourceError::Unauthenticated
                | ResourceError::Forbidden
                | ResourceError::NotFound(_)
                | ResourceError::Conflict(_)
        )
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;
