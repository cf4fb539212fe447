use anyhow::Context;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use casedesk_core::cookie::{self, CookieOptions};
use serde_json::{json, Value};

use super::{id_string, json_body, text_field};
use crate::error::AppError;
use crate::session::{clear_session_cookies, SessionToken};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;
const GENERIC: &str = "An error occurred. Please try again later.";

/// POST /api/auth/login: exchange credentials for a session.
pub async fn login(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Internal server error")?;
    if text_field(&body, "email").is_none() || text_field(&body, "password").is_none() {
        return Err(AppError::unprocessable("Email and password are required"));
    }

    let reply = app
        .backend
        .send(app.backend.post("/login", None).json(&body))
        .await
        .context("Internal server error")?;
    if !reply.is_success() {
        return reply.relay();
    }
    let data = reply.json().context("Internal server error")?;

    let Some(token) = data.pointer("/data/authorization/token").and_then(Value::as_str) else {
        return Err(AppError::internal("Token missing from API response"));
    };
    let user = data.pointer("/data/user").cloned().unwrap_or(Value::Null);

    let opts = app.cookie_options();
    let mut headers = HeaderMap::new();
    set_cookie(&mut headers, cookie::AUTH_TOKEN, token, opts)?;
    if let Some(id) = user.get("id").and_then(id_string) {
        set_cookie(&mut headers, cookie::USER_ID, &id, opts)?;
    }
    if let Some(role) = text_field(&user, "role") {
        set_cookie(&mut headers, cookie::ROLE, role, opts)?;
    }
    if let Some(name) = text_field(&user, "name") {
        set_cookie(&mut headers, cookie::NAME, name, opts)?;
    }

    tracing::info!(user_id = ?user.get("id"), "login succeeded");
    Ok((
        headers,
        Json(json!({ "message": "Login successful", "user": user })),
    )
        .into_response())
}

/// POST /api/auth/signup: register and start a session.
pub async fn signup(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Internal server error")?;
    let (Some(name), Some(email), Some(password)) = (
        text_field(&body, "name"),
        text_field(&body, "email"),
        text_field(&body, "password"),
    ) else {
        return Err(AppError::bad_request("Name, email and password are required"));
    };

    let req = app
        .backend
        .post("/register", None)
        .json(&json!({ "name": name, "email": email, "password": password }));
    let reply = match app.backend.send(req).await {
        Ok(reply) => reply,
        Err(e) if is_connect_error(&e) => {
            return Err(AppError::status(
                StatusCode::SERVICE_UNAVAILABLE,
                "Unable to connect to backend server",
            ));
        }
        Err(e) => return Err(e.context("Internal server error").into()),
    };

    if !reply.is_json() {
        tracing::error!(status = reply.status.as_u16(), "register returned non-JSON response");
        return Err(AppError::internal(
            "Backend server error. Please try again later.",
        ));
    }
    if !reply.is_success() {
        return reply.relay();
    }
    let data = reply.json().context("Internal server error")?;

    let Some(token) = data.pointer("/data/authorization/token").and_then(Value::as_str) else {
        tracing::error!("register response carried no token");
        return Err(AppError::internal("Token missing from API"));
    };

    let mut headers = HeaderMap::new();
    set_cookie(&mut headers, cookie::AUTH_TOKEN, token, app.cookie_options())?;

    let body = json!({
        "success": true,
        "message": data.get("message").and_then(Value::as_str).unwrap_or("Registration successful"),
        "user": data.pointer("/data/user").cloned().unwrap_or(Value::Null),
        "setup": data.pointer("/data/setup").cloned().unwrap_or(Value::Null),
    });
    Ok((StatusCode::CREATED, headers, Json(body)).into_response())
}

/// POST /api/auth/logout: drop every session cookie.
pub async fn logout() -> Response {
    let mut headers = HeaderMap::new();
    clear_session_cookies(&mut headers);
    (headers, Json(json!({ "message": "Logged out successfully" }))).into_response()
}

/// GET /api/auth/me: the user behind the current session.
pub async fn me(
    State(app): State<AppState>,
    token: SessionToken,
) -> Result<Json<Value>, AppError> {
    let reply = app
        .backend
        .send(app.backend.get("/me", Some(token.as_str())))
        .await
        .context("Authentication check failed")?;
    if !reply.is_success() {
        return Err(AppError::unauthorized_with("Invalid token"));
    }
    let user = reply.json().context("Authentication check failed")?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, GENERIC)?;
    let Some(email) = text_field(&body, "email") else {
        return Err(AppError::bad_request("Email is required"));
    };

    let req = app
        .backend
        .post("/forgot-password", None)
        .json(&json!({ "email": email }));
    password_reply(
        &app,
        req,
        "Failed to send reset link",
        "Password reset link sent successfully",
    )
    .await
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, GENERIC)?;
    let fields = (
        text_field(&body, "token"),
        text_field(&body, "email"),
        text_field(&body, "password"),
        text_field(&body, "password_confirmation"),
    );
    let (Some(token), Some(email), Some(password), Some(confirmation)) = fields else {
        return Err(AppError::bad_request("All fields are required"));
    };
    if password != confirmation {
        return Err(AppError::bad_request("Passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let req = app.backend.post("/reset-password", None).json(&json!({
        "token": token,
        "email": email,
        "password": password,
        "password_confirmation": confirmation,
    }));
    password_reply(&app, req, "Failed to reset password", "Password reset successfully").await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Shared reply shaping for the password endpoints: errors keep only
/// `message` and `errors`, successes only `message`.
async fn password_reply(
    app: &AppState,
    req: reqwest::RequestBuilder,
    failed: &str,
    succeeded: &str,
) -> Result<Response, AppError> {
    let reply = app.backend.send(req).await.context(GENERIC)?;
    let data = reply.json().context(GENERIC)?;
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    if !reply.is_success() {
        let body = json!({
            "message": message.as_deref().unwrap_or(failed),
            "errors": data.get("errors").cloned().unwrap_or_else(|| json!({})),
        });
        return Ok((reply.status, Json(body)).into_response());
    }
    let body = json!({ "message": message.as_deref().unwrap_or(succeeded) });
    Ok((StatusCode::OK, Json(body)).into_response())
}

fn set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    opts: CookieOptions,
) -> Result<(), AppError> {
    let rendered = cookie::session(name, &cookie::encode_value(value), opts);
    headers.append(SET_COOKIE, HeaderValue::from_str(&rendered)?);
    Ok(())
}

fn is_connect_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_connect())
}
