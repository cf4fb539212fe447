use anyhow::Context;
use axum::extract::{Multipart, Path, State};
use axum::http::Method;
use axum::response::Response;
use bytes::Bytes;
use casedesk_core::chat::{build_payload, history_from_value, ContentBlock};
use casedesk_core::feedback::{build_feedback_message, Feedback};
use serde_json::Value;

use super::cases::{encode, fetch_document, messages_path};
use super::chat::{fetch_case, image_attachments, send_payload};
use super::{forward, id_string, json_body};
use crate::backend::segment;
use crate::error::AppError;
use crate::session::SessionToken;
use crate::state::AppState;
use crate::upload;

fn case_path(case_id: &str, rest: &str) -> String {
    format!("/feedback/cases/{}/{rest}", segment(case_id))
}

fn item_path(id: &str) -> String {
    format!("/feedback/{}", segment(id))
}

/// GET /api/feedback/cases/{case_id}/feedback
pub async fn list_feedback(
    State(app): State<AppState>,
    token: SessionToken,
    Path(case_id): Path<String>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .get(&case_path(&case_id, "feedback"), Some(token.as_str()));
    forward(&app, req, "Failed to fetch feedback").await
}

/// POST /api/feedback/cases/{case_id}/feedback
pub async fn create_feedback(
    State(app): State<AppState>,
    token: SessionToken,
    Path(case_id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Failed to submit feedback")?;
    let req = app
        .backend
        .post(&case_path(&case_id, "feedback"), Some(token.as_str()))
        .json(&body);
    forward(&app, req, "Failed to submit feedback").await
}

/// GET /api/feedback/cases/{case_id}/feedback/statistics
pub async fn statistics(
    State(app): State<AppState>,
    token: SessionToken,
    Path(case_id): Path<String>,
) -> Result<Response, AppError> {
    let req = app.backend.get(
        &case_path(&case_id, "feedback/statistics"),
        Some(token.as_str()),
    );
    forward(&app, req, "Failed to fetch feedback statistics").await
}

/// GET /api/feedback/cases/{case_id}/pending-feedback
pub async fn pending(
    State(app): State<AppState>,
    token: SessionToken,
    Path(case_id): Path<String>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .get(&case_path(&case_id, "pending-feedback"), Some(token.as_str()));
    forward(&app, req, "Failed to fetch pending feedback").await
}

/// GET /api/feedback/{id}
pub async fn get_feedback(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app.backend.get(&item_path(&id), Some(token.as_str()));
    forward(&app, req, "Failed to fetch feedback").await
}

/// PUT /api/feedback/{id}
pub async fn update_feedback(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Failed to update feedback")?;
    let req = app
        .backend
        .request(Method::PUT, &item_path(&id), Some(token.as_str()))
        .json(&body);
    forward(&app, req, "Failed to update feedback").await
}

/// DELETE /api/feedback/{id}
pub async fn delete_feedback(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .request(Method::DELETE, &item_path(&id), Some(token.as_str()));
    forward(&app, req, "Failed to delete feedback").await
}

/// POST /api/feedback/{id}/documents: forward the form field by field.
pub async fn upload_documents(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = upload::to_form(upload::read_entries(multipart).await?)?;
    let req = app
        .backend
        .post(&format!("{}/documents", item_path(&id)), Some(token.as_str()))
        .multipart(form);
    let reply = app
        .backend
        .send(req)
        .await
        .context("Failed to upload documents")?;
    reply.relay_strict("Failed to upload documents")
}

/// POST /api/feedback/{id}/analyze
pub async fn analyze(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .post(&format!("{}/analyze", item_path(&id)), Some(token.as_str()));
    let reply = app
        .backend
        .send(req)
        .await
        .context("AI analysis failed")?;
    reply.relay_strict("AI analysis failed")
}

/// POST /api/feedback/cases/{case_id}/pending-feedback/send
///
/// Turn the case's pending feedback into a chat message, attach its
/// documents and send it to the assistant.
pub async fn send_pending(
    State(app): State<AppState>,
    token: SessionToken,
    Path(case_id): Path<String>,
) -> Result<Response, AppError> {
    const FAILED: &str = "Failed to send feedback to chat";

    let reply = app
        .backend
        .send(
            app.backend
                .get(&case_path(&case_id, "pending-feedback"), Some(token.as_str())),
        )
        .await
        .context(FAILED)?;
    if !reply.is_success() {
        return reply.relay();
    }
    let pending = Feedback::from_pending_response(&reply.json().context(FAILED)?)
        .inspect_err(|e| tracing::warn!(case_id = %case_id, "malformed pending feedback: {e}"))
        .context(FAILED)?;
    let Some(feedback) = pending else {
        return Err(AppError::not_found("No pending feedback"));
    };

    let case_ref = Value::String(case_id.clone());
    let Some(case) = fetch_case(&app, &token, &case_ref).await else {
        return Err(AppError::bad_request("Case data not available"));
    };

    let message = build_feedback_message(&feedback);
    let case_documents = fetch_case_documents(&app, &token, &case_id).await;
    let mut attachments = image_attachments(&app, &token, &case_documents).await;
    attachments.extend(feedback_attachments(&app, &token, &feedback).await);
    let history = fetch_history(&app, &token, &case_id).await;
    tracing::info!(
        case_id = %case_id,
        feedback_id = ?id_string(&feedback.id),
        attachments = attachments.len(),
        "relaying pending feedback to chat"
    );

    let payload = build_payload(
        case_ref,
        &message,
        &case,
        history,
        attachments,
        Some(feedback.id.clone()),
    );
    send_payload(&app, &token, &payload).await
}

/// Every feedback document as a base64 `image` or `document` block.
async fn feedback_attachments(
    app: &AppState,
    token: &SessionToken,
    feedback: &Feedback,
) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    for doc in &feedback.documents {
        let Some(id) = id_string(&doc.id) else {
            continue;
        };
        match fetch_document(app, token, &id).await {
            Ok((data, served_as)) => {
                let media_type = doc
                    .media_type
                    .clone()
                    .or(served_as)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                blocks.push(ContentBlock::attachment(&media_type, encode(&data)));
            }
            Err(e) => tracing::warn!(document_id = %id, "skipping feedback document: {e:#}"),
        }
    }
    blocks
}

/// The case's uploaded documents, or nothing when they cannot be loaded.
async fn fetch_case_documents(app: &AppState, token: &SessionToken, case_id: &str) -> Vec<Value> {
    let path = format!("/case/{}/case-documents", segment(case_id));
    let reply = app
        .backend
        .send(app.backend.get(&path, Some(token.as_str())))
        .await;
    match reply {
        Ok(reply) if reply.is_success() => match reply.json() {
            Ok(body) => body
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!("unreadable case documents: {e:#}");
                Vec::new()
            }
        },
        Ok(reply) => {
            tracing::warn!(status = reply.status.as_u16(), "case documents unavailable");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("failed to fetch case documents: {e:#}");
            Vec::new()
        }
    }
}

/// The case's chat history, or nothing when it cannot be loaded.
async fn fetch_history(
    app: &AppState,
    token: &SessionToken,
    case_id: &str,
) -> Vec<casedesk_core::chat::ChatMessage> {
    let reply = app
        .backend
        .send(app.backend.get(&messages_path(case_id), Some(token.as_str())))
        .await;
    match reply {
        Ok(reply) if reply.is_success() => match reply.json() {
            Ok(body) => history_from_value(body.get("data")),
            Err(e) => {
                tracing::warn!("unreadable message history: {e:#}");
                Vec::new()
            }
        },
        Ok(reply) => {
            tracing::warn!(status = reply.status.as_u16(), "message history unavailable");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("failed to fetch message history: {e:#}");
            Vec::new()
        }
    }
}
