use crate::domain::GovernanceConfig;
use crate::transport::http::auth::{AuthenticatedPrincipal, RequireAdmin};
use crate::transport::http::error::{json_422, ApiResult, ErrorResponse};
use crate::transport::http::types::{
    ApiResponse, AppState, CastVoteRequest, CreateProposalRequest, ExecuteProposalResponse,
    ProposalListQuery,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/governance/config",
    tag = "governance",
    responses((status = 200, description = "Current governance parameters", body = ApiResponse))
)]
pub async fn get_config_handler(State(state): State<AppState>) -> ApiResult<Json<ApiResponse>> {
    ApiResponse::ok(state.governance.config().await?)
}

#[utoipa::path(
    put,
    path = "/api/governance/config",
    tag = "governance",
    request_body = GovernanceConfig,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Governance parameters replaced", body = ApiResponse),
        (status = 400, description = "Inconsistent parameters", body = ErrorResponse),
        (status = 403, description = "Admins only", body = ErrorResponse)
    )
)]
pub async fn update_config_handler(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    request: Result<Json<GovernanceConfig>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(config) = request.map_err(|e| json_422(e, "GovernanceConfig"))?;
    ApiResponse::ok(state.governance.update_config(&admin, config).await?)
}

#[utoipa::path(
    get,
    path = "/api/governance/proposals",
    tag = "governance",
    params(ProposalListQuery),
    responses((status = 200, description = "Proposals, newest first", body = ApiResponse))
)]
pub async fn list_proposals_handler(
    State(state): State<AppState>,
    Query(query): Query<ProposalListQuery>,
) -> ApiResult<Json<ApiResponse>> {
    ApiResponse::ok(state.governance.list(query.active_only).await?)
}

#[utoipa::path(
    post,
    path = "/api/governance/proposals",
    tag = "governance",
    request_body = CreateProposalRequest,
    security(("api_key" = [])),
    responses(
        (status = 201, description = "Proposal opened for voting", body = ApiResponse),
        (status = 400, description = "Voting period outside the configured bounds", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 409, description = "Governance is inactive", body = ErrorResponse)
    )
)]
pub async fn create_proposal_handler(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    request: Result<Json<CreateProposalRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse>)> {
    let Json(request) = request.map_err(|e| json_422(e, "CreateProposalRequest"))?;
    request.validate()?;
    let proposal = state
        .governance
        .create_proposal(&principal, request.into())
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(proposal)?))
}

#[utoipa::path(
    get,
    path = "/api/governance/proposals/{id}",
    tag = "governance",
    params(("id" = Uuid, Path, description = "Proposal id")),
    responses(
        (status = 200, description = "The proposal and its votes", body = ApiResponse),
        (status = 404, description = "Unknown proposal", body = ErrorResponse)
    )
)]
pub async fn get_proposal_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse>> {
    ApiResponse::ok(state.governance.get(id).await?)
}

#[utoipa::path(
    post,
    path = "/api/governance/proposals/{id}/votes",
    tag = "governance",
    params(("id" = Uuid, Path, description = "Proposal id")),
    request_body = CastVoteRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Vote counted", body = ApiResponse),
        (status = 409, description = "Voting closed or caller already voted", body = ErrorResponse)
    )
)]
pub async fn cast_vote_handler(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
    request: Result<Json<CastVoteRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse>> {
    let Json(request) = request.map_err(|e| json_422(e, "CastVoteRequest"))?;
    request.validate()?;
    let proposal = state
        .governance
        .vote(&principal, id, request.vote_yes, request.vote_weight)
        .await?;
    ApiResponse::ok(proposal)
}

#[utoipa::path(
    post,
    path = "/api/governance/proposals/{id}/execute",
    tag = "governance",
    params(("id" = Uuid, Path, description = "Proposal id")),
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Proposal closed with its outcome", body = ApiResponse),
        (status = 409, description = "Voting still open, quorum missed or already executed", body = ErrorResponse)
    )
)]
pub async fn execute_proposal_handler(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse>> {
    let (proposal, outcome) = state.governance.execute(&principal, id).await?;
    ApiResponse::ok(ExecuteProposalResponse { proposal, outcome })
}
