use anyhow::Context;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use casedesk_core::export::{self, ExportFormat};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;

use super::cases::relay_failure;
use super::{forward, json_body, text_field};
use crate::backend::{segment, BackendReply, HOP_BY_HOP};
use crate::error::AppError;
use crate::session::SessionToken;
use crate::state::AppState;

/// POST /api/documents/generate: may answer with an upgrade prompt.
pub async fn generate(
    State(app): State<AppState>,
    token: SessionToken,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Document generation failed")?;
    let req = app
        .backend
        .post("/documents/generate", Some(token.as_str()))
        .json(&body);
    forward(&app, req, "Document generation failed").await
}

/// DELETE /api/documents/{id}
pub async fn delete_document(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let req = app.backend.request(
        Method::DELETE,
        &format!("/documents/{}", segment(&id)),
        Some(token.as_str()),
    );
    forward(&app, req, "Failed to delete document").await
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
}

/// GET /api/documents/{id}/download?format=F: binary passthrough.
pub async fn download(
    State(app): State<AppState>,
    token: SessionToken,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    const FAILED: &str = "Failed to download document";
    let format = query
        .format
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "pdf".to_string());

    let req = app
        .backend
        .get(
            &format!("/documents/{}/download", segment(&id)),
            Some(token.as_str()),
        )
        .query(&[("format", &format)]);
    let upstream = app.backend.open(req).await.context(FAILED)?;

    if !upstream.status().is_success() {
        let reply = BackendReply::read(upstream).await.context(FAILED)?;
        return relay_failure(reply);
    }

    let headers = upstream.headers();
    let filename = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(disposition_filename)
        .unwrap_or_else(|| format!("document.{format}"));
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_ext(&format)
                .first_or_octet_stream()
                .to_string()
        });

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        );
    for (name, value) in headers {
        let lower = name.as_str();
        if HOP_BY_HOP.contains(&lower)
            || name == CONTENT_TYPE
            || name == CONTENT_DISPOSITION
            || name == SET_COOKIE
        {
            continue;
        }
        builder = builder.header(name, value);
    }

    // Stream without buffering.
    let stream = upstream
        .bytes_stream()
        .map(|chunk| chunk.map_err(std::io::Error::other));
    builder.body(Body::from_stream(stream)).context(FAILED).map_err(AppError)
}

/// POST /api/documents/export: render a generated document as a file.
pub async fn export_document(body: Bytes) -> Result<Response, AppError> {
    let body: Value = json_body(&body, "Failed to export document")?;
    let Some(content) = body.get("content").and_then(Value::as_str) else {
        return Err(AppError::bad_request("Content is required"));
    };
    let name = text_field(&body, "name").unwrap_or("document");
    let format = ExportFormat::parse(text_field(&body, "format").unwrap_or("txt"))?;

    let doc = export::export(name, content, format);
    tracing::debug!(filename = %doc.filename, "exporting document");
    let disposition = format!(
        "attachment; filename=\"{}\"",
        doc.filename.replace('"', "")
    );
    Ok((
        [
            (CONTENT_TYPE, doc.content_type.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        doc.body,
    )
        .into_response())
}

/// The `filename` parameter of a `Content-Disposition` header.
fn disposition_filename(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let start = lower.find("filename=")? + "filename=".len();
    let value = header[start..].split(';').next()?.trim().trim_matches('"');
    (!value.is_empty()).then(|| value.replace('"', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    #[test]
    fn filename_from_disposition() {
        assert_eq!(
            disposition_filename("attachment; filename=\"Demand Letter.pdf\"").as_deref(),
            Some("Demand Letter.pdf")
        );
        assert_eq!(
            disposition_filename("attachment; FILENAME=notice.docx; size=10").as_deref(),
            Some("notice.docx")
        );
        assert_eq!(disposition_filename("inline"), None);
        assert_eq!(disposition_filename("attachment; filename=\"\""), None);
    }

    #[tokio::test]
    async fn export_strips_markdown_for_text() {
        let body = json!({ "name": "Demand Letter", "content": "# Title\n**Pay** now", "format": "txt" });
        let resp = export_document(Bytes::from(body.to_string())).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"Demand_Letter.txt\""
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Title\nPay now");
    }

    #[tokio::test]
    async fn export_rejects_unknown_format() {
        let body = json!({ "content": "x", "format": "pdf" });
        let err = export_document(Bytes::from(body.to_string())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_requires_content() {
        let err = export_document(Bytes::from(json!({ "name": "x" }).to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
