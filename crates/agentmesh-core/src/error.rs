//! Core error type for the AgentMesh orchestrator.
//!
//! `ServerError` is what callers of the core see: not-found lookups, bad
//! input, and terminal workflow failures. Tier failures, subscriber delivery
//! failures and summary failures are recovered locally and never show up
//! here. When the `axum` feature is enabled, it also implements
//! `IntoResponse` so it can be used directly as an axum handler error type.

use crate::models::StepResult;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A workflow run that started but could not finish. The steps that did
    /// complete are carried along so callers can show partial progress.
    #[error("Workflow execution failed: {message}")]
    WorkflowFailed {
        workflow_id: String,
        message: String,
        partial_results: Vec<StepResult>,
    },
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, body) = match self {
            ServerError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg }))
            }
            ServerError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ServerError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
            ServerError::WorkflowFailed {
                workflow_id,
                message,
                partial_results,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": format!("Workflow execution failed: {}", message),
                    "workflowId": workflow_id,
                    "partialResults": partial_results,
                }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
