use reqwest::StatusCode;

/// Error taxonomy for the workflow services.
///
/// Services perform a single attempt per operation and never retry; every
/// failure is surfaced to the caller as one of these variants. Absent data
/// that is a legitimate empty result (an empty cart, an empty order index)
/// is `Ok` with an empty collection, not `NotFound`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The backend rejected the credential or the security rules denied the
    /// operation. Covers every non-success HTTP status from the store.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Transport-level failure talking to the backend.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A status or payment-status transition rejected by the lifecycle table.
    #[error("invalid status transition: {0}")]
    InvalidStatus(String),

    /// A stored record that failed to decode into its typed shape.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl ServiceError {
    /// Classifies a non-success backend response.
    ///
    /// The store signals rule rejections and expired credentials alike with
    /// non-2xx statuses, so they all map to `PermissionDenied`, matching the
    /// single failure mode the storefront client observes.
    pub fn from_backend_status(status: StatusCode, path: &str) -> Self {
        ServiceError::PermissionDenied(format!("{} on {}", status, path))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::BackendUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}
