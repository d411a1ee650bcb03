//! API key authentication.
//!
//! Clients send the shared key as `x-api-key` or as a Bearer token. When the
//! server has no key configured every request is accepted (development
//! mode).

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::error::AppError;
use crate::AppState;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header naming the calling application. Informational only.
pub const APP_ID_HEADER: &str = "x-app-id";

/// Caller that passed the key check.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Application id the client announced, if any
    pub app_id: Option<String>,
}

impl FromRequestParts<AppState> for ApiClient {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app_id = header(&parts.headers, APP_ID_HEADER).map(str::to_string);

        let Some(expected) = state.config.api_key.as_deref() else {
            // No key configured, allow anonymous access
            return Ok(ApiClient { app_id });
        };

        match presented_key(&parts.headers) {
            Some(key) if key == expected => Ok(ApiClient { app_id }),
            Some(_) => {
                tracing::warn!(app_id = ?app_id, "rejected request with wrong api key");
                Err(AppError::Unauthorized)
            }
            None => Err(AppError::Unauthorized),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Key from `x-api-key`, else from `Authorization: Bearer`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    header(headers, API_KEY_HEADER).or_else(|| {
        header(headers, AUTHORIZATION.as_str())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}
