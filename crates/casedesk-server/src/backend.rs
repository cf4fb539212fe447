//! HTTP client for the backend REST API.
//!
//! Every proxy handler goes through [`BackendClient`]: it attaches the bearer
//! credential and `Accept: application/json`, and [`BackendReply`] turns the
//! answer back into a browser response.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use casedesk_core::config::GatewayConfig;
use casedesk_core::upgrade;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde_json::Value;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Hop-by-hop headers: never copied from a backend response.
// ---------------------------------------------------------------------------

pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const SNIPPET_LEN: usize = 500;

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: Arc<GatewayConfig>,
}

impl BackendClient {
    pub fn new(config: Arc<GatewayConfig>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("failed to build backend HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn url(&self, path: &str) -> String {
        self.config.backend_endpoint(path)
    }

    /// Start a request to `path` on the backend, authenticated with `token`
    /// when one is given.
    pub fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, self.url(path))
            .header(ACCEPT, "application/json");
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req
    }

    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        self.request(Method::GET, path, token)
    }

    pub fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        self.request(Method::POST, path, token)
    }

    /// Send and buffer the whole reply.
    pub async fn send(&self, req: RequestBuilder) -> anyhow::Result<BackendReply> {
        let resp = self.open(req).await?;
        BackendReply::read(resp).await
    }

    /// Send and hand back the unread response, for streaming passthrough.
    pub async fn open(&self, req: RequestBuilder) -> anyhow::Result<reqwest::Response> {
        req.send().await.map_err(|e| {
            tracing::warn!(
                url = e.url().map(|u| u.as_str()).unwrap_or("?"),
                "backend request failed: {e}"
            );
            anyhow::Error::new(e)
        })
    }
}

/// A fully buffered backend response.
#[derive(Debug)]
pub struct BackendReply {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl BackendReply {
    pub async fn read(resp: reqwest::Response) -> anyhow::Result<Self> {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .context("failed to read backend response")?;
        Ok(Self {
            status,
            content_type,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// True when the backend declared a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    pub fn json(&self) -> anyhow::Result<Value> {
        serde_json::from_slice(&self.body).context("backend returned invalid JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn snippet(&self) -> String {
        self.text().chars().take(SNIPPET_LEN).collect()
    }

    /// Relay status and JSON body. Error bodies carrying an upgrade prompt
    /// are restructured; every other body passes through unchanged.
    pub fn relay(self) -> Result<Response, AppError> {
        let body = self.json()?;
        let body = if self.is_success() {
            body
        } else {
            error_body(body)
        };
        Ok((self.status, Json(body)).into_response())
    }

    /// Like [`relay`](Self::relay), but a reply without a JSON content type
    /// becomes a 500 carrying `message`.
    pub fn relay_strict(self, message: &str) -> Result<Response, AppError> {
        if !self.is_json() {
            tracing::error!(
                status = self.status.as_u16(),
                "backend returned non-JSON response: {}",
                self.snippet()
            );
            return Err(AppError::internal(message));
        }
        self.relay()
    }

    /// Like [`relay`](Self::relay), but an unparseable body is wrapped as
    /// `{ message, raw }` under the backend's status.
    pub fn relay_or_raw(self) -> Result<Response, AppError> {
        match self.json() {
            Ok(_) => self.relay(),
            Err(_) => {
                let raw = self.text();
                let body = serde_json::json!({
                    "message": "Backend did not return JSON",
                    "raw": raw,
                });
                Ok((self.status, Json(body)).into_response())
            }
        }
    }
}

/// Restructure an upgrade-required error for the browser, logging which plan
/// limit was hit.
pub fn error_body(body: Value) -> Value {
    if let Some(prompt) = upgrade::upgrade_prompt(&body) {
        let label = |v: &Value| upgrade::plan_label(v.as_str().unwrap_or_default());
        tracing::info!(
            current_plan = %label(&prompt.data.current_plan),
            upgrade_to = %label(&prompt.data.upgrade_to),
            "plan limit reached"
        );
    }
    upgrade::reshape_error_body(body)
}

/// Percent-encode one path segment taken from the browser before it is placed
/// into a backend URL.
pub fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
