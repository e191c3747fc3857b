use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::warn;

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Store and ledger reachable", body = ApiResponse),
        (status = 503, description = "Store or ledger unreachable", body = ApiResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.assets.ledger();
    let store_result = state.assets.store().ping().await;
    let ledger_result = ledger.ping().await;

    let store_status = if store_result.is_ok() { "ok" } else { "unreachable" };
    let ledger_status = if ledger_result.is_ok() { "ok" } else { "unreachable" };
    let overall = if store_result.is_ok() && ledger_result.is_ok() {
        "ok"
    } else {
        "unhealthy"
    };
    let data = json!({
        "status": overall,
        "store": store_status,
        "ledger": { "backend": ledger.name(), "status": ledger_status },
    });

    let mut errors = Vec::new();
    if let Err(e) = store_result {
        warn!(error = %e, "health: store ping failed");
        errors.push(format!("store ping failed: {}", e));
    }
    if let Err(e) = ledger_result {
        warn!(error = %e, "health: ledger ping failed");
        errors.push(format!("ledger ping failed: {}", e));
    }

    if errors.is_empty() {
        (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: Some(data),
                error: Some(errors.join("; ")),
            }),
        )
    }
}
