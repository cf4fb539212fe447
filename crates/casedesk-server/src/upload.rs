//! Multipart bodies received from the browser and re-sent to the backend.

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum FormEntry {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    },
}

impl FormEntry {
    pub fn name(&self) -> &str {
        match self {
            FormEntry::Text { name, .. } | FormEntry::File { name, .. } => name,
        }
    }
}

/// Buffer every field of an incoming multipart body, in order.
pub async fn read_entries(mut multipart: Multipart) -> Result<Vec<FormEntry>, AppError> {
    let mut entries = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(form_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(form_error)?;
                entries.push(FormEntry::File {
                    name,
                    file_name: Some(file_name),
                    content_type,
                    data,
                });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(form_error)?;
                entries.push(FormEntry::Text { name, value });
            }
        }
    }
    Ok(entries)
}

/// Malformed forms are a 400; a body over the configured limit keeps the
/// 413 axum reports for it.
fn form_error(e: MultipartError) -> AppError {
    AppError::status(e.status(), format!("Invalid form data: {}", e.body_text()))
}

/// Rebuild an outgoing form from buffered entries.
pub fn to_form(entries: Vec<FormEntry>) -> Result<Form, AppError> {
    let mut form = Form::new();
    for entry in entries {
        form = match entry {
            FormEntry::Text { name, value } => form.text(name, value),
            FormEntry::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                let mut part = Part::bytes(data.to_vec());
                if let Some(file_name) = file_name {
                    part = part.file_name(file_name);
                }
                if let Some(content_type) = content_type {
                    part = part.mime_str(&content_type)?;
                }
                form.part(name, part)
            }
        };
    }
    Ok(form)
}
