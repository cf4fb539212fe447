pub mod auth;
pub mod billing;
pub mod cases;
pub mod chat;
pub mod contact;
pub mod documents;
pub mod feedback;

use anyhow::Context;
use axum::response::Response;
use bytes::Bytes;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

/// Send `req` and relay the reply. `failure` becomes the `message` of the
/// 500 returned when the backend is unreachable or answers with a body that
/// is not JSON.
pub(crate) async fn forward(
    app: &AppState,
    req: RequestBuilder,
    failure: &'static str,
) -> Result<Response, AppError> {
    let reply = app.backend.send(req).await.context(failure)?;
    reply.relay().map_err(|e| AppError(e.0.context(failure)))
}

/// Parse a JSON request body whatever its content type. A body that does
/// not parse is a 500 carrying `failure`, like any other handler failure.
pub(crate) fn json_body<T: DeserializeOwned>(
    body: &Bytes,
    failure: &'static str,
) -> Result<T, AppError> {
    let parsed = serde_json::from_slice(body).context(failure)?;
    Ok(parsed)
}

/// A non-empty string field of a JSON request body.
pub(crate) fn text_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Render an id that may arrive as a JSON number or string.
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
