use anyhow::Context;
use axum::extract::State;
use axum::response::Response;
use bytes::Bytes;
use casedesk_core::chat::{build_payload, history_from_value, CaseContext, ChatPayload, ContentBlock};
use serde::Deserialize;
use serde_json::Value;

use super::cases::{encode, fetch_document};
use super::{forward, id_string, json_body};
use crate::backend::segment;
use crate::error::AppError;
use crate::session::SessionToken;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    #[serde(default)]
    pub all_case_id: Value,
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "caseData")]
    pub case_data: Option<Value>,
    #[serde(default, rename = "conversationHistory")]
    pub conversation_history: Option<Value>,
    #[serde(default, rename = "caseDocuments")]
    pub case_documents: Option<Vec<Value>>,
    #[serde(default)]
    pub feedback_id: Option<Value>,
}

/// POST /api/chat/send: assemble the assistant payload and send it.
pub async fn send_message(
    State(app): State<AppState>,
    token: SessionToken,
    body: Bytes,
) -> Result<Response, AppError> {
    let req: SendMessage = json_body(&body, "Failed to send message")?;
    let case = match req.case_data.as_ref().filter(|v| !v.is_null()) {
        Some(record) => CaseContext::from_record(record),
        None => fetch_case(&app, &token, &req.all_case_id).await,
    };
    let Some(case) = case else {
        return Err(AppError::bad_request("Case data not available"));
    };

    let documents = req.case_documents.unwrap_or_default();
    let attachments = image_attachments(&app, &token, &documents).await;
    let history = history_from_value(req.conversation_history.as_ref());
    let feedback_id = req.feedback_id.filter(is_present);

    let payload = build_payload(
        req.all_case_id,
        &req.message,
        &case,
        history,
        attachments,
        feedback_id,
    );
    send_payload(&app, &token, &payload).await
}

/// POST the assembled payload to the backend's chat endpoint and relay.
pub(crate) async fn send_payload(
    app: &AppState,
    token: &SessionToken,
    payload: &ChatPayload,
) -> Result<Response, AppError> {
    tracing::debug!(
        messages = payload.messages.len(),
        feedback = payload.feedback_id.is_some(),
        "sending chat message"
    );
    let req = app
        .backend
        .post("/chat/send", Some(token.as_str()))
        .json(payload);
    forward(app, req, "Failed to send message").await
}

/// Load the case record the prompt is written from. Failures are logged and
/// reported as "no case".
pub(crate) async fn fetch_case(
    app: &AppState,
    token: &SessionToken,
    case_id: &Value,
) -> Option<CaseContext> {
    let id = id_string(case_id)?;
    let path = format!("/case/{}", segment(&id));
    let result = async {
        let reply = app
            .backend
            .send(app.backend.get(&path, Some(token.as_str())))
            .await?;
        if !reply.is_success() {
            anyhow::bail!("case lookup returned {}", reply.status);
        }
        reply.json().context("case record")
    }
    .await;

    match result {
        Ok(record) => CaseContext::from_record(&record),
        Err(e) => {
            tracing::warn!(case_id = %id, "failed to fetch case data: {e:#}");
            None
        }
    }
}

/// Base64 `image` blocks for every case document with an image media type.
/// Documents that cannot be fetched are skipped.
pub(crate) async fn image_attachments(
    app: &AppState,
    token: &SessionToken,
    documents: &[Value],
) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    for doc in documents {
        let Some(media_type) = doc
            .get("mime_type")
            .and_then(Value::as_str)
            .filter(|m| m.starts_with("image/"))
        else {
            continue;
        };
        let Some(id) = doc.get("id").and_then(id_string) else {
            continue;
        };
        match fetch_document(app, token, &id).await {
            Ok((data, _)) => blocks.push(ContentBlock::attachment(media_type, encode(&data))),
            Err(e) => tracing::warn!(document_id = %id, "skipping image: {e:#}"),
        }
    }
    blocks
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_browser_field_names() {
        let req: SendMessage = serde_json::from_value(json!({
            "all_case_id": 4,
            "message": "What now?",
            "caseData": { "issue_type": "wage" },
            "conversationHistory": [{ "role": "assistant", "content": "Hi" }],
            "caseDocuments": [{ "id": 1, "mime_type": "image/png" }],
        }))
        .unwrap();
        assert_eq!(req.all_case_id, json!(4));
        assert!(req.case_data.is_some());
        assert_eq!(req.case_documents.unwrap().len(), 1);
        assert!(req.feedback_id.is_none());
    }

    #[test]
    fn falsy_feedback_ids_are_dropped() {
        assert!(!is_present(&json!(null)));
        assert!(!is_present(&json!("")));
        assert!(!is_present(&json!(0)));
        assert!(is_present(&json!(17)));
        assert!(is_present(&json!("fb-1")));
    }
}
