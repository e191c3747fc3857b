use crate::app::AssetHistory;
use crate::domain::{Asset, AssetCategory};
use crate::storage::{AssetFilter, DEFAULT_PAGE_SIZE};
use crate::transport::http::auth::{
    RequireAdmin, RequireAssetWriter, RequireValuer, RequireVerifier,
};
use crate::transport::http::error::{json_422, ApiResult, ErrorResponse};
use crate::transport::http::types::{
    AddDocumentRequest, AddValuationRequest, ApiResponse, AppState, AssetListResponse,
    CreateAssetRequest, DelistAssetRequest, DistributeIncomeRequest, ListAssetsQuery,
    PaginationQuery, SearchQuery, SetTradabilityRequest, TokenizeAssetRequest,
    UpdateAssetRequest, VerifyAssetRequest,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[utoipa::path(
    get,
    path = "/api/assets",
    tag = "assets",
    params(ListAssetsQuery),
    responses(
        (status = 200, description = "Page of assets, newest first", body = ApiResponse),
        (status = 400, description = "Invalid pagination", body = ErrorResponse)
    )
)]
pub async fn list_assets_handler(
    State(state): State<AppState>,
    Query(query): Query<ListAssetsQuery>,
) -> ApiResult<Json<ApiResponse>> {
    let filter = AssetFilter {
        category: query.category,
        status: query.status,
        owner: query.owner,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    let (page, per_page) = (filter.page, filter.per_page);
    let result = state.assets.list(filter).await?;
    ApiResponse::ok(AssetListResponse::from_page(result, page, per_page))
}

#[utoipa::path(
    get,
    path = "/api/assets/search",
    tag = "assets",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching assets", body = ApiResponse),
        (status = 400, description = "Empty query", body = ErrorResponse)
    )
)]
pub async fn search_assets_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse>> {
    let items = state
        .assets
        .search(&query.q, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .await?;
    ApiResponse::ok(items)
}

#[utoipa::path(
    get,
    path = "/api/assets/category/{category}",
    tag = "assets",
    params(
        ("category" = String, Path, description = "real_estate, art, collectible, commodity, vehicle or other"),
        PaginationQuery
    ),
    responses(
        (status = 200, description = "Page of assets in the category", body = ApiResponse),
        (status = 400, description = "Unknown category", body = ErrorResponse)
    )
)]
pub async fn assets_by_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Json<ApiResponse>> {
    let category: AssetCategory = category.parse()?;
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE);
    let result = state.assets.by_category(category, page, per_page).await?;
    ApiResponse::ok(AssetListResponse::from_page(result, page, per_page))
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    responses(
        (status = 200, description = "The asset", body = ApiResponse),
        (status = 404, description = "Unknown asset", body = ErrorResponse)
    )
)]
pub async fn get_asset_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse>> {
    let asset: Asset = state.assets.get(id).await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    get,
    path = "/api/assets/{id}/history",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    responses(
        (status = 200, description = "Valuation and status history", body = ApiResponse),
        (status = 404, description = "Unknown asset", body = ErrorResponse)
    )
)]
pub async fn asset_history_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse>> {
    let history: AssetHistory = state.assets.history(id).await?;
    ApiResponse::ok(history)
}

#[utoipa::path(
    post,
    path = "/api/assets",
    tag = "assets",
    request_body = CreateAssetRequest,
    security(("api_key" = [])),
    responses(
        (status = 201, description = "Asset listed as pending", body = ApiResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Role not allowed", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn create_asset_handler(
    State(state): State<AppState>,
    RequireAssetWriter(principal): RequireAssetWriter,
    request: Result<Json<CreateAssetRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    let Json(request) = request.map_err(|e| json_422(e, "CreateAssetRequest"))?;
    request.validate()?;
    let asset = state.assets.create(&principal, request.into()).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(asset)?))
}

#[utoipa::path(
    put,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = UpdateAssetRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Updated asset", body = ApiResponse),
        (status = 403, description = "Role not allowed or not the owner", body = ErrorResponse),
        (status = 404, description = "Unknown asset", body = ErrorResponse),
        (status = 409, description = "Status transition not allowed", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 502, description = "Valuation could not be pushed on chain", body = ErrorResponse)
    )
)]
pub async fn update_asset_handler(
    State(state): State<AppState>,
    RequireAssetWriter(principal): RequireAssetWriter,
    Path(id): Path<Uuid>,
    request: Result<Json<UpdateAssetRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "UpdateAssetRequest"))?;
    request.validate()?;
    let asset = state.assets.update(&principal, id, request.into()).await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    delete,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Asset deleted", body = ApiResponse),
        (status = 403, description = "Admins only", body = ErrorResponse),
        (status = 404, description = "Unknown asset", body = ErrorResponse),
        (status = 409, description = "Asset still has a live token", body = ErrorResponse)
    )
)]
pub async fn delete_asset_handler(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse>> {
    state.assets.delete(id).await?;
    ApiResponse::ok(serde_json::json!({ "id": id, "deleted": true }))
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/verify",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = VerifyAssetRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Verification recorded", body = ApiResponse),
        (status = 403, description = "Admins and verifiers only", body = ErrorResponse),
        (status = 409, description = "Action not valid in the current status", body = ErrorResponse)
    )
)]
pub async fn verify_asset_handler(
    State(state): State<AppState>,
    RequireVerifier(principal): RequireVerifier,
    Path(id): Path<Uuid>,
    request: Result<Json<VerifyAssetRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "VerifyAssetRequest"))?;
    request.validate()?;
    let asset = state
        .assets
        .verify(&principal, id, request.action, request.notes)
        .await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/valuations",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = AddValuationRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Valuation appended", body = ApiResponse),
        (status = 403, description = "Role not allowed", body = ErrorResponse),
        (status = 502, description = "Valuation could not be pushed on chain", body = ErrorResponse)
    )
)]
pub async fn add_valuation_handler(
    State(state): State<AppState>,
    RequireValuer(principal): RequireValuer,
    Path(id): Path<Uuid>,
    request: Result<Json<AddValuationRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "AddValuationRequest"))?;
    request.validate()?;
    let asset = state
        .assets
        .add_valuation(
            &principal,
            id,
            request.amount,
            request.source.trim(),
            request.notes,
        )
        .await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/documents",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = AddDocumentRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Document attached", body = ApiResponse),
        (status = 403, description = "Role not allowed or not the owner", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn add_document_handler(
    State(state): State<AppState>,
    RequireAssetWriter(principal): RequireAssetWriter,
    Path(id): Path<Uuid>,
    request: Result<Json<AddDocumentRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "AddDocumentRequest"))?;
    request.validate()?;
    let asset = state
        .assets
        .add_document(&principal, id, request.into())
        .await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/tokenize",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = TokenizeAssetRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Asset tokenized on chain", body = ApiResponse),
        (status = 409, description = "Asset not verified or already tokenized", body = ErrorResponse),
        (status = 502, description = "Chain submission failed; asset rolled back to verified", body = ErrorResponse)
    )
)]
pub async fn tokenize_asset_handler(
    State(state): State<AppState>,
    RequireAssetWriter(principal): RequireAssetWriter,
    Path(id): Path<Uuid>,
    request: Result<Json<TokenizeAssetRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "TokenizeAssetRequest"))?;
    request.validate()?;
    let asset = state.assets.tokenize(&principal, id, request.into()).await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/tradability",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = SetTradabilityRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Tradability updated", body = ApiResponse),
        (status = 409, description = "Asset not tokenized or token burned", body = ErrorResponse),
        (status = 502, description = "Chain submission failed", body = ErrorResponse)
    )
)]
pub async fn set_tradability_handler(
    State(state): State<AppState>,
    RequireAssetWriter(principal): RequireAssetWriter,
    Path(id): Path<Uuid>,
    request: Result<Json<SetTradabilityRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "SetTradabilityRequest"))?;
    let asset = state
        .assets
        .set_tradability(&principal, id, request.is_tradable)
        .await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/income",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = DistributeIncomeRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Income distribution recorded", body = ApiResponse),
        (status = 400, description = "Total distributed income would overflow", body = ErrorResponse),
        (status = 409, description = "Asset not tokenized or token burned", body = ErrorResponse),
        (status = 502, description = "Ledger rejected the distribution", body = ErrorResponse)
    )
)]
pub async fn distribute_income_handler(
    State(state): State<AppState>,
    RequireAssetWriter(principal): RequireAssetWriter,
    Path(id): Path<Uuid>,
    request: Result<Json<DistributeIncomeRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "DistributeIncomeRequest"))?;
    request.validate()?;
    let asset = state
        .assets
        .distribute_income(&principal, id, request.amount)
        .await?;
    ApiResponse::ok(asset)
}

#[utoipa::path(
    post,
    path = "/api/assets/{id}/delist",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = DelistAssetRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Asset delisted; a live token is burned first", body = ApiResponse),
        (status = 403, description = "Admins only", body = ErrorResponse),
        (status = 409, description = "Asset already delisted", body = ErrorResponse),
        (status = 502, description = "Burn transaction failed", body = ErrorResponse)
    )
)]
pub async fn delist_asset_handler(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    request: Result<Json<DelistAssetRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "DelistAssetRequest"))?;
    request.validate()?;
    let asset = state.assets.delist(&admin, id, request.reason).await?;
    ApiResponse::ok(asset)
}
