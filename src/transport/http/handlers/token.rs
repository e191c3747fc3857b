use crate::transport::http::auth::{AuthenticatedPrincipal, RequireAdmin};
use crate::transport::http::error::{json_422, ApiResult, ErrorResponse};
use crate::transport::http::types::{
    ApiResponse, AppState, FeeQuoteQuery, InitializeTokenRequest, PauseTransfersRequest,
    TransferAuthorityRequest, UpdateFeesRequest,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/token",
    tag = "token",
    responses(
        (status = 200, description = "Platform token state", body = ApiResponse),
        (status = 404, description = "Token not initialized", body = ErrorResponse)
    )
)]
pub async fn get_token_handler(State(state): State<AppState>) -> ApiResult<Json<ApiResponse>> {
    ApiResponse::ok(state.tokenomics.get().await?)
}

#[utoipa::path(
    post,
    path = "/api/token/initialize",
    tag = "token",
    request_body = InitializeTokenRequest,
    security(("api_key" = [])),
    responses(
        (status = 201, description = "Token initialized; caller becomes the authority", body = ApiResponse),
        (status = 403, description = "Admins only", body = ErrorResponse),
        (status = 409, description = "Already initialized", body = ErrorResponse)
    )
)]
pub async fn initialize_token_handler(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    request: Result<Json<InitializeTokenRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    let Json(request) = request.map_err(|e| json_422(e, "InitializeTokenRequest"))?;
    request.validate()?;
    let token = state
        .tokenomics
        .initialize(
            &admin,
            request.name.trim(),
            &request.symbol,
            &request.uri,
            request.total_supply,
        )
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(token)?))
}

#[utoipa::path(
    put,
    path = "/api/token/fees",
    tag = "token",
    request_body = UpdateFeesRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Fee configuration updated", body = ApiResponse),
        (status = 403, description = "Caller is not the token authority", body = ErrorResponse)
    )
)]
pub async fn update_fees_handler(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    request: Result<Json<UpdateFeesRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "UpdateFeesRequest"))?;
    request.validate()?;
    ApiResponse::ok(state.tokenomics.update_fees(&admin, request.into()).await?)
}

#[utoipa::path(
    post,
    path = "/api/token/pause",
    tag = "token",
    request_body = PauseTransfersRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Transfer pause flag updated", body = ApiResponse),
        (status = 403, description = "Caller is not the token authority", body = ErrorResponse)
    )
)]
pub async fn pause_transfers_handler(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    request: Result<Json<PauseTransfersRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "PauseTransfersRequest"))?;
    ApiResponse::ok(
        state
            .tokenomics
            .set_transfer_pause(&admin, request.paused)
            .await?,
    )
}

#[utoipa::path(
    post,
    path = "/api/token/authority/transfer",
    tag = "token",
    request_body = TransferAuthorityRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Pending authority recorded", body = ApiResponse),
        (status = 403, description = "Caller is not the token authority", body = ErrorResponse)
    )
)]
pub async fn transfer_authority_handler(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    request: Result<Json<TransferAuthorityRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "TransferAuthorityRequest"))?;
    request.validate()?;
    ApiResponse::ok(
        state
            .tokenomics
            .transfer_authority(&admin, request.new_authority.trim())
            .await?,
    )
}

#[utoipa::path(
    post,
    path = "/api/token/authority/accept",
    tag = "token",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Caller is now the token authority", body = ApiResponse),
        (status = 403, description = "Caller is not the pending authority", body = ErrorResponse)
    )
)]
pub async fn accept_authority_handler(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> ApiResult<Json<ApiResponse>> {
    ApiResponse::ok(state.tokenomics.accept_authority(&principal).await?)
}

#[utoipa::path(
    get,
    path = "/api/token/fee-quote",
    tag = "token",
    params(FeeQuoteQuery),
    responses(
        (status = 200, description = "Fee charged on a transfer of `amount`", body = ApiResponse),
        (status = 409, description = "Transfers are paused", body = ErrorResponse)
    )
)]
pub async fn fee_quote_handler(
    State(state): State<AppState>,
    Query(query): Query<FeeQuoteQuery>,
) -> ApiResult<Json<ApiResponse>> {
    ApiResponse::ok(state.tokenomics.fee_quote(query.amount).await?)
}
