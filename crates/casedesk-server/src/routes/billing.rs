//! Payments, credit top-ups, subscriptions and usage.

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use casedesk_core::billing::CreditPack;
use serde_json::{json, Value};

use super::{forward, json_body};
use crate::backend::segment;
use crate::error::AppError;
use crate::session::SessionToken;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

fn payment_path(id: &str, action: Option<&str>) -> String {
    match action {
        Some(action) => format!("/payments/{}/{action}", segment(id)),
        None => format!("/payments/{}", segment(id)),
    }
}

/// A JSON body that may be absent; an empty body reads as `{}`.
fn optional_json(body: &Bytes) -> Result<Value, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("Invalid JSON body: {e}")))
}

/// POST /api/payments/initialize
pub async fn initialize_payment(
    State(app): State<AppState>,
    token: SessionToken,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Failed to initialize payment")?;
    let req = app
        .backend
        .post("/payments/initialize", Some(token.as_str()))
        .json(&body);
    let reply = app
        .backend
        .send(req)
        .await
        .context("Failed to initialize payment")?;
    reply.relay_or_raw()
}

/// POST /api/payments/{id}/verify
pub async fn verify_payment(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body = optional_json(&body)?;
    let req = app
        .backend
        .post(&payment_path(&id, Some("verify")), Some(token.as_str()))
        .json(&body);
    let reply = app
        .backend
        .send(req)
        .await
        .context("Failed to verify payment")?;
    reply.relay_or_raw()
}

/// GET /api/payments/gateways
pub async fn gateways(
    State(app): State<AppState>,
    token: SessionToken,
) -> Result<Response, AppError> {
    let req = app.backend.get("/payments/gateways", Some(token.as_str()));
    forward(&app, req, "Failed to fetch payment gateways").await
}

/// GET /api/payments: filters pass through as query parameters.
pub async fn list_payments(
    State(app): State<AppState>,
    token: SessionToken,
    Query(filters): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .get("/payments", Some(token.as_str()))
        .query(&filters);
    forward(&app, req, "Failed to fetch payments").await
}

/// GET /api/payments/{id}
pub async fn get_payment(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .get(&payment_path(&id, None), Some(token.as_str()));
    forward(&app, req, "Failed to fetch payment").await
}

/// POST /api/payments/{id}/mark-received
pub async fn mark_received(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .post(&payment_path(&id, Some("mark-received")), Some(token.as_str()));
    forward(&app, req, "Failed to mark payment as received").await
}

/// POST /api/payments/{id}/refund: body `{ amount }`, optional.
pub async fn refund(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body = optional_json(&body)?;
    let req = app
        .backend
        .post(&payment_path(&id, Some("refund")), Some(token.as_str()))
        .json(&body);
    forward(&app, req, "Failed to refund payment").await
}

// ---------------------------------------------------------------------------
// Credits
// ---------------------------------------------------------------------------

/// POST /api/credits/purchase: start a checkout for a credit pack.
pub async fn purchase_credits(
    State(app): State<AppState>,
    token: SessionToken,
    body: Bytes,
) -> Result<Response, AppError> {
    const FAILED: &str = "Failed to process credit purchase request";
    let body: Value = json_body(&body, FAILED)?;
    let pack = CreditPack::from_amount(body.get("amount")).map_err(|_| {
        AppError::bad_request("Invalid credit amount. Choose $5, $10, or $20.")
    })?;

    let req = app
        .backend
        .post("/credit-purchases", Some(token.as_str()))
        .json(&json!({ "amount": pack.dollars() }));
    let reply = app.backend.send(req).await.context(FAILED)?;
    let data = reply.json().context(FAILED)?;

    let accepted = data.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !reply.is_success() || !accepted {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Failed to initialize credit purchase");
        return Ok((
            reply.status,
            Json(json!({ "success": false, "message": message })),
        )
            .into_response());
    }

    tracing::info!(dollars = pack.dollars(), "credit checkout created");
    Ok(Json(json!({
        "success": true,
        "message": "Checkout session created",
        "data": {
            "checkout_url": data.pointer("/data/checkout_url").cloned().unwrap_or(Value::Null),
            "session_id": data.pointer("/data/session_id").cloned().unwrap_or(Value::Null),
        }
    }))
    .into_response())
}

// ---------------------------------------------------------------------------
// Subscriptions and usage
// ---------------------------------------------------------------------------

/// POST /api/subscription/downgrade
pub async fn downgrade(
    State(app): State<AppState>,
    token: SessionToken,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .post("/subscription/downgrade", Some(token.as_str()));
    forward(&app, req, "Failed to downgrade subscription").await
}

/// POST /api/subscriptions/store-or-update
pub async fn store_or_update(
    State(app): State<AppState>,
    token: SessionToken,
    body: Bytes,
) -> Result<Response, AppError> {
    const FAILED: &str = "Server error occurred while saving the subscription";
    let body: Value = json_body(&body, FAILED)?;
    let req = app
        .backend
        .post("/subscriptions/store-or-update", Some(token.as_str()))
        .json(&body);
    let reply = app.backend.send(req).await.context(FAILED)?;
    reply.relay_strict(FAILED)
}

/// GET /api/user/subscription
pub async fn user_subscription(
    State(app): State<AppState>,
    token: SessionToken,
) -> Result<Response, AppError> {
    let req = app.backend.get("/user/subscription", Some(token.as_str()));
    forward(&app, req, "Failed to fetch subscription").await
}

/// GET /api/usage/summary: unwraps `data` on success.
pub async fn usage_summary(
    State(app): State<AppState>,
    token: SessionToken,
) -> Result<Response, AppError> {
    const FAILED: &str = "Failed to fetch usage summary";
    let reply = app
        .backend
        .send(app.backend.get("/usage/summary", Some(token.as_str())))
        .await
        .context(FAILED)?;
    let data = reply.json().context(FAILED)?;

    if !reply.is_success() {
        let body = json!({
            "success": false,
            "message": data.get("message").and_then(Value::as_str).unwrap_or(FAILED),
            "errors": data.get("errors").cloned().unwrap_or(Value::Null),
        });
        return Ok((reply.status, Json(body)).into_response());
    }
    let summary = data
        .get("data")
        .filter(|inner| !inner.is_null())
        .cloned()
        .unwrap_or(data);
    Ok(Json(json!({ "success": true, "data": summary })).into_response())
}
