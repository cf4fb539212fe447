use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::Value;

use super::{forward, json_body};
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/contact: public contact details. Any failure answers `null`.
pub async fn contact_info(State(app): State<AppState>) -> Response {
    let reply = match app.backend.send(app.backend.get("/contact-info", None)).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!("contact info unavailable: {e:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Null)).into_response();
        }
    };
    if !reply.is_success() {
        return (reply.status, Json(Value::Null)).into_response();
    }
    match reply.json() {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!("contact info unreadable: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(Value::Null)).into_response()
        }
    }
}

/// POST /api/contact: submit the public contact form.
pub async fn submit_contact(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Internal Server Error")?;
    let req = app.backend.post("/contact", None).json(&body);
    forward(&app, req, "Internal Server Error").await
}
