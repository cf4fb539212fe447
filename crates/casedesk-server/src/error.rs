use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use casedesk_core::CoreError;

// ---------------------------------------------------------------------------
// Internal sentinel for locally decided error statuses
// ---------------------------------------------------------------------------

/// Carries an explicit status and message through the `anyhow::Error`
/// chain. Rendered as `{ "success": false, "message": … }`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct StatusError {
    status: StatusCode,
    message: String,
}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// Anything that is not a [`StatusError`] or a known [`CoreError`] becomes a
/// 500 whose `message` is the outermost context attached by the handler and
/// whose `error` is the root cause.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn status(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(
            StatusError {
                status,
                message: msg.into(),
            }
            .into(),
        )
    }

    /// 400 Bad Request.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::status(StatusCode::BAD_REQUEST, msg)
    }

    /// 401 with the message every proxy handler uses for a missing session.
    pub fn unauthorized() -> Self {
        Self::status(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn unauthorized_with(msg: impl Into<String>) -> Self {
        Self::status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, msg)
    }

    /// 422 Unprocessable Entity.
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::status(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    /// 500 with a fixed message and no cause.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(e) = self.0.downcast_ref::<StatusError>() {
            let body = serde_json::json!({ "success": false, "message": e.message });
            return (e.status, axum::Json(body)).into_response();
        }

        if let Some(e) = self.0.downcast_ref::<CoreError>() {
            let status = match e {
                CoreError::InvalidCreditAmount(_) | CoreError::InvalidExportFormat(_) => {
                    StatusCode::BAD_REQUEST
                }
                CoreError::ConfigNotFound(_)
                | CoreError::InvalidConfig(_)
                | CoreError::Io(_)
                | CoreError::Yaml(_)
                | CoreError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status != StatusCode::INTERNAL_SERVER_ERROR {
                let body = serde_json::json!({ "success": false, "message": e.to_string() });
                return (status, axum::Json(body)).into_response();
            }
        }

        tracing::error!("request failed: {:#}", self.0);
        let body = serde_json::json!({
            "success": false,
            "message": self.0.to_string(),
            "error": self.0.root_cause().to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
