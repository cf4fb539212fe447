use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use casedesk_core::cookie;
use casedesk_core::guard::{GuardDecision, GuardPolicy};

use crate::error::AppError;
use crate::state::AppState;

/// Value of cookie `name` across every `Cookie:` header on the request.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| cookie::find(h, name))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The raw session credential from the `authToken` cookie.
///
/// Rejects with `401 Unauthorized` when the cookie is missing, so handlers
/// that take this extractor never contact the backend without a credential.
/// The token is forwarded as-is; the backend is the authority on it.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        cookie_value(&parts.headers, cookie::AUTH_TOKEN)
            .map(SessionToken)
            .ok_or_else(AppError::unauthorized)
    }
}

/// Page guard middleware.
///
/// Verifies the `authToken` cookie and applies the [`GuardPolicy`] decision:
/// pass through, redirect to the login page with every session cookie
/// cleared, or redirect elsewhere. API and asset paths are never inspected.
pub async fn session_guard(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if GuardPolicy::is_exempt(&path) {
        return next.run(req).await;
    }

    let token = cookie_value(req.headers(), cookie::AUTH_TOKEN);
    let role = cookie_value(req.headers(), cookie::ROLE);
    let claims = app.verifier.authenticate(token.as_deref());

    match app.guard.decide(&path, claims.as_ref(), role.as_deref()) {
        GuardDecision::Pass => next.run(req).await,
        GuardDecision::RedirectToLogin(location) => {
            tracing::debug!(path = %path, "no valid session, redirecting to {location}");
            let mut resp = Redirect::temporary(&location).into_response();
            clear_session_cookies(resp.headers_mut());
            resp
        }
        GuardDecision::Redirect(location) => {
            tracing::debug!(path = %path, "redirecting to {location}");
            Redirect::temporary(&location).into_response()
        }
    }
}

/// Append an expiring `Set-Cookie` for every session cookie.
pub fn clear_session_cookies(headers: &mut HeaderMap) {
    for name in cookie::SESSION_COOKIES {
        if let Ok(value) = HeaderValue::from_str(&cookie::expired(name)) {
            headers.append(SET_COOKIE, value);
        }
    }
}
