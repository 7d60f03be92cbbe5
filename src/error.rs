//! Client error taxonomy.
//!
//! Three classes of failure reach callers:
//! - **[`ApiError::Validation`]**: caught locally before any network call
//!   (e.g. password too short).
//! - **[`ApiError::Unauthorized`]**: a 401 that survived the single
//!   refresh-and-retry path, or a rejected login. The fix is to log in again.
//! - **[`ApiError::Backend`]**: every other 4xx/5xx, passed through with the
//!   message extracted from the response body. No classification, no
//!   automatic recovery; the caller retries manually.
//!
//! Transport failures and cancelled requests get their own variants so the
//! CLI can distinguish "backend said no" from "request never completed".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client-side validation failure; no network call was made.
    #[error("{0}")]
    Validation(String),

    /// Authentication failed and the refresh path is exhausted.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Any non-401 error response from the backend.
    #[error("backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    /// Transport-level failure (connect, TLS, body decode).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request was aborted via the cancellation token.
    #[error("request cancelled")]
    Cancelled,

    /// A protected command was run without an authenticated session.
    #[error("not logged in; run `ctxr login <email>` first")]
    NotLoggedIn,
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

/// Extract a human-readable message from an error response body.
///
/// The backend wraps error messages in a `{"detail": "..."}` envelope.
/// Falls back to the raw body, or `HTTP <status>` when the body is empty
/// or not JSON.
pub fn extract_detail(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail") {
            if let Some(s) = detail.as_str() {
                return s.to_string();
            }
            // Validation errors arrive as structured detail; keep them readable.
            return detail.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.to_string()
    }
}
