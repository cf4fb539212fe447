use anyhow::Context;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{forward, json_body};
use crate::backend::segment;
use crate::error::AppError;
use crate::session::SessionToken;
use crate::state::AppState;
use crate::upload::{self, FormEntry};

/// Text fields the backend accepts when a case is opened.
const CASE_FIELDS: &[&str] = &[
    "issue_type",
    "location_city",
    "location_state",
    "location_country",
    "situation_description",
    "status",
];

/// POST /api/case: open a new case with its supporting documents.
pub async fn create_case(
    State(app): State<AppState>,
    token: SessionToken,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let entries = case_entries(upload::read_entries(multipart).await?);
    let documents = entries
        .iter()
        .filter(|e| matches!(e, FormEntry::File { .. }))
        .count();
    tracing::debug!(documents, "forwarding new case");

    let form = upload::to_form(entries)?;
    let req = app.backend.post("/case", Some(token.as_str())).multipart(form);
    forward(&app, req, "Failed to create case").await
}

/// GET /api/case/{id}
pub async fn get_case(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app
        .backend
        .get(&format!("/case/{}", segment(&id)), Some(token.as_str()));
    forward(&app, req, "Failed to fetch case").await
}

/// GET /api/case/{id}/case-documents
pub async fn case_documents(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app.backend.get(
        &format!("/case/{}/case-documents", segment(&id)),
        Some(token.as_str()),
    );
    forward(&app, req, "Failed to fetch case documents").await
}

/// PATCH /api/case/{id}/mark-resolved
pub async fn mark_resolved(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app.backend.request(
        axum::http::Method::PATCH,
        &format!("/case/{}/mark-resolved", segment(&id)),
        Some(token.as_str()),
    );
    forward(&app, req, "Failed to mark case resolved").await
}

/// GET /api/case/{id}/outcome
pub async fn get_outcome(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app.backend.get(
        &format!("/case/{}/outcome", segment(&id)),
        Some(token.as_str()),
    );
    forward(&app, req, "Failed to fetch outcome").await
}

/// POST /api/case/{id}/outcome
pub async fn record_outcome(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Failed to record outcome")?;
    let req = app
        .backend
        .post(
            &format!("/case/{}/outcome", segment(&id)),
            Some(token.as_str()),
        )
        .json(&body);
    forward(&app, req, "Failed to record outcome").await
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// GET /api/case/user/all-cases?page=N
pub async fn all_cases(
    State(app): State<AppState>,
    token: SessionToken,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let page = query
        .page
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "1".to_string());
    let req = app
        .backend
        .get("/case/user/all-cases", Some(token.as_str()))
        .query(&[("page", page)]);
    forward(&app, req, "Failed to fetch cases").await
}

/// GET /api/case/document/{id}/content: the raw file, base64-encoded.
pub async fn document_content(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let reply = app
        .backend
        .send(app.backend.get(&content_path(&id), Some(token.as_str())))
        .await
        .context("Failed to fetch document content")?;
    if !reply.is_success() {
        return relay_failure(reply);
    }
    let media_type = reply
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(Json(json!({
        "success": true,
        "data": {
            "base64": encode(&reply.body),
            "media_type": media_type,
        }
    }))
    .into_response())
}

/// GET /api/cases/{case_id}/documents
pub async fn list_documents(
    State(app): State<AppState>,
    token: SessionToken,
    Path(case_id): Path<String>,
) -> Result<Response, AppError> {
    let req = app.backend.get(
        &format!("/cases/{}/documents", segment(&case_id)),
        Some(token.as_str()),
    );
    forward(&app, req, "Failed to fetch case documents").await
}

/// GET /api/cases/{case_id}/messages
pub async fn list_messages(
    State(app): State<AppState>,
    token: SessionToken,
    Path(case_id): Path<String>,
) -> Result<Response, AppError> {
    let reply = app
        .backend
        .send(app.backend.get(&messages_path(&case_id), Some(token.as_str())))
        .await
        .context("Failed to fetch messages")?;

    if !reply.is_success() {
        tracing::warn!(status = reply.status.as_u16(), "backend refused message history");
        let details = reply
            .json()
            .unwrap_or_else(|_| json!({ "message": reply.text() }));
        let body = json!({
            "success": false,
            "error": "Failed to fetch messages",
            "details": details,
        });
        return Ok((reply.status, Json(body)).into_response());
    }
    reply
        .relay()
        .map_err(|e| AppError(e.0.context("Failed to fetch messages")))
}

// ---------------------------------------------------------------------------
// Helpers shared with the chat and feedback flows
// ---------------------------------------------------------------------------

pub(crate) fn content_path(document_id: &str) -> String {
    format!("/case/document/{}/content", segment(document_id))
}

pub(crate) fn messages_path(case_id: &str) -> String {
    format!("/cases/{}/messages", segment(case_id))
}

pub(crate) fn encode(data: &Bytes) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Fetch a stored document's bytes and content type.
pub(crate) async fn fetch_document(
    app: &AppState,
    token: &SessionToken,
    document_id: &str,
) -> anyhow::Result<(Bytes, Option<String>)> {
    let reply = app
        .backend
        .send(app.backend.get(&content_path(document_id), Some(token.as_str())))
        .await?;
    if !reply.is_success() {
        anyhow::bail!("document {document_id} returned {}", reply.status);
    }
    Ok((reply.body, reply.content_type))
}

/// An error reply that may or may not carry JSON.
pub(crate) fn relay_failure(reply: crate::backend::BackendReply) -> Result<Response, AppError> {
    if reply.json().is_ok() {
        return reply.relay();
    }
    let body = json!({ "success": false, "message": reply.text() });
    Ok((reply.status, Json(body)).into_response())
}

/// Keep the case fields and every non-empty uploaded document. Documents
/// may arrive as `documents[i]` or `documents[]`; they are renumbered
/// `documents[0]`, `documents[1]`, … in arrival order.
pub(crate) fn case_entries(entries: Vec<FormEntry>) -> Vec<FormEntry> {
    let mut kept = Vec::new();
    let mut index = 0;
    for entry in entries {
        match entry {
            FormEntry::Text { .. } if CASE_FIELDS.contains(&entry.name()) => kept.push(entry),
            FormEntry::File {
                name,
                file_name,
                content_type,
                data,
            } if is_document_field(&name) && !data.is_empty() => {
                kept.push(FormEntry::File {
                    name: format!("documents[{index}]"),
                    file_name,
                    content_type,
                    data,
                });
                index += 1;
            }
            _ => {}
        }
    }
    kept
}

fn is_document_field(name: &str) -> bool {
    name.strip_prefix("documents[")
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|idx| idx.is_empty() || idx.parse::<usize>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(name: &str, value: &str) -> FormEntry {
        FormEntry::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    fn file(name: &str, data: &'static [u8]) -> FormEntry {
        FormEntry::File {
            name: name.into(),
            file_name: Some("lease.pdf".into()),
            content_type: Some("application/pdf".into()),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn document_field_names() {
        assert!(is_document_field("documents[0]"));
        assert!(is_document_field("documents[12]"));
        assert!(is_document_field("documents[]"));
        assert!(!is_document_field("documents"));
        assert!(!is_document_field("documents[x]"));
        assert!(!is_document_field("avatar"));
    }

    #[test]
    fn case_form_keeps_known_fields_and_renumbers_files() {
        let entries = vec![
            text("issue_type", "security_deposit"),
            text("csrf", "drop-me"),
            file("documents[0]", b"pdf-bytes"),
            file("documents[1]", b""),
            file("documents[]", b"more"),
            text("status", "open"),
        ];
        let kept = case_entries(entries);
        let names: Vec<_> = kept.iter().map(FormEntry::name).collect();
        assert_eq!(
            names,
            ["issue_type", "documents[0]", "documents[1]", "status"]
        );
    }

    #[test]
    fn paths_are_segment_encoded() {
        assert_eq!(content_path("9"), "/case/document/9/content");
        assert_eq!(messages_path("a/b"), "/cases/a%2Fb/messages");
    }

    #[test]
    fn base64_uses_standard_alphabet() {
        assert_eq!(encode(&Bytes::from_static(b"\xfb\xff")), "+/8=");
    }
}
