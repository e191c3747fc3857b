//! Double-submit cookie CSRF protection for cookie-authenticated writes.

use axum::{
    extract::Request,
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::transport::http::auth::{cookie_value, extract_credential, CredentialSource};
use crate::transport::http::error::ApiError;

pub const CSRF_COOKIE: &str = "realstack_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_TOKEN_LENGTH: usize = 32;

pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Constant-time comparison of the submitted token against the cookie.
pub fn validate_csrf_token(submitted: &str, expected: &str) -> bool {
    if submitted.len() != expected.len() || expected.is_empty() {
        return false;
    }
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// `Set-Cookie` value for a freshly issued token.
pub fn csrf_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; SameSite=Strict", CSRF_COOKIE, token);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn is_unsafe(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// True when the request must present a matching token and does not.
pub fn csrf_violation(method: &Method, headers: &HeaderMap) -> bool {
    if !is_unsafe(method) {
        return false;
    }
    if !matches!(extract_credential(headers), Some((_, CredentialSource::Cookie))) {
        return false;
    }
    let Some(expected) = cookie_value(headers, CSRF_COOKIE) else {
        return true;
    };
    let submitted = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    !validate_csrf_token(submitted, &expected)
}

pub async fn csrf_protection(request: Request, next: Next) -> Result<Response, ApiError> {
    if csrf_violation(request.method(), request.headers()) {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "CSRF token missing or mismatched"
        );
        return Err(ApiError::CsrfValidationFailed);
    }
    Ok(next.run(request).await)
}
