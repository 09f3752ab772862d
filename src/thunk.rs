// Async actions ("thunks")
//
// A thunk runs one API call and turns its outcome into either a fulfilled
// value or a Rejection carrying a human readable message. Rejections are
// plain values: nothing is retried, nothing panics, and a failure only
// affects the operation that raised it.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// Message used when an error has nothing to say
pub const GENERIC_FAILURE: &str = "Something went wrong";

/// Lifecycle of the most recent dispatch of a thunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Fulfilled,
    Rejected(String),
}

/// A failed thunk: which action, and what to tell the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub action: &'static str,
    pub message: String,
}

impl Rejection {
    pub fn new(action: &'static str, error: &impl fmt::Display) -> Self {
        let message = error.to_string();
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        };
        Rejection { action, message }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Rejection {}

pub type ThunkResult<T> = Result<T, Rejection>;

/// Await one API call, mapping any error to a Rejection
pub async fn run_thunk<T, E, F>(action: &'static str, call: F) -> ThunkResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    debug!(action, "pending");
    match call.await {
        Ok(value) => {
            debug!(action, "fulfilled");
            Ok(value)
        }
        Err(error) => {
            let rejection = Rejection::new(action, &error);
            warn!(action, message = %rejection.message, "rejected");
            Err(rejection)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[tokio::test]
    async fn test_fulfilled_passes_value_through() {
        let result = run_thunk("families/fetch", async { Ok::<_, ApiError>(vec![1, 2, 3]) }).await;
        assert_eq!(result.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rejected_carries_message() {
        let result: ThunkResult<()> =
            run_thunk("families/delete", async { Err(ApiError::not_found("Family", 9)) }).await;

        let rejection = result.unwrap_err();
        assert_eq!(rejection.action, "families/delete");
        assert_eq!(rejection.message, "Family not found");
    }

    #[tokio::test]
    async fn test_empty_message_falls_back() {
        let result: ThunkResult<()> =
            run_thunk("foranes/add", async { Err(ApiError::Failure(String::new())) }).await;
        assert_eq!(result.unwrap_err().message, GENERIC_FAILURE);
    }

    #[test]
    fn test_status_json() {
        let json = serde_json::to_value(ActionStatus::Rejected("offline".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "rejected", "message": "offline"}));
    }
}
