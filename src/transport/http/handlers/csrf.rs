use crate::transport::http::csrf::{csrf_cookie, generate_csrf_token};
use crate::transport::http::error::ApiResult;
use crate::transport::http::types::{ApiResponse, AppState, CsrfTokenResponse};
use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

/// Issues a token as both a cookie and the response body. Cookie-authenticated clients echo it
/// back in `X-CSRF-Token` on every write.
#[utoipa::path(
    get,
    path = "/api/csrf-token",
    tag = "security",
    responses(
        (status = 200, description = "Fresh CSRF token; also set as the realstack_csrf cookie", body = ApiResponse)
    )
)]
pub async fn csrf_token_handler(State(state): State<AppState>) -> ApiResult<Response> {
    let token = generate_csrf_token();
    let cookie = csrf_cookie(&token, state.security.hsts_enabled);
    let mut response = ApiResponse::ok(CsrfTokenResponse { csrf_token: token })?.into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    Ok(response)
}
