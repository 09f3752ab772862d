// Error taxonomy for the ledger API
//
// Three kinds of failure reach callers:
// - Validation: rejected before the repository is touched
// - NotFound: update/delete/contribution referencing a missing id
// - Failure: anything else (simulated network errors, storage errors)

use thiserror::Error;

/// Errors returned by [`crate::api::MockApi`] operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Required field missing or malformed
    #[error("{0}")]
    Validation(String),

    /// Record with the given id does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: u64 },

    /// Generic failure (network, storage)
    #[error("{0}")]
    Failure(String),
}

impl ApiError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        ApiError::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Require a non-blank text field
pub(crate) fn require(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    Ok(())
}
