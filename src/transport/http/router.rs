use crate::app::{AssetHistory, FeeQuote};
use crate::domain::{
    Asset, AssetCategory, AssetDocument, AssetStatus, FeeConfig, GovernanceConfig,
    IncomeDistributionFrequency, PlatformToken, Proposal, ProposalOutcome, ProposalType, Role,
    StatusChange, TokenDistribution, Tokenization, Valuation, Verification, VerificationAction,
    VerificationStatus, VoteRecord,
};
use crate::transport::http::csrf::csrf_protection;
use crate::transport::http::error::{ErrorResponse, FieldError, ValidationErrorDetails};
use crate::transport::http::handlers::{assets, csrf, governance, health, metrics, token};
use crate::transport::http::middleware::{
    cors_layer, request_id, request_logging, security_headers, track_metrics,
};
use crate::transport::http::rate_limit::rate_limit;
use crate::transport::http::types::{
    AddDocumentRequest, AddValuationRequest, ApiResponse, AppState, AssetListResponse,
    CastVoteRequest, CreateAssetRequest, CreateProposalRequest, CsrfTokenResponse,
    DelistAssetRequest, DistributeIncomeRequest, ExecuteProposalResponse, InitializeTokenRequest,
    PauseTransfersRequest, SetTradabilityRequest, TokenizeAssetRequest, TransferAuthorityRequest,
    UpdateAssetRequest, UpdateFeesRequest, VerifyAssetRequest,
};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RealStack API",
        description = "Real-world asset registry, verification and Solana tokenization"
    ),
    paths(
        health::healthcheck_handler,
        metrics::metrics_handler,
        csrf::csrf_token_handler,
        assets::list_assets_handler,
        assets::search_assets_handler,
        assets::assets_by_category_handler,
        assets::get_asset_handler,
        assets::asset_history_handler,
        assets::create_asset_handler,
        assets::update_asset_handler,
        assets::delete_asset_handler,
        assets::verify_asset_handler,
        assets::add_valuation_handler,
        assets::add_document_handler,
        assets::tokenize_asset_handler,
        assets::set_tradability_handler,
        assets::distribute_income_handler,
        assets::delist_asset_handler,
        token::get_token_handler,
        token::initialize_token_handler,
        token::update_fees_handler,
        token::pause_transfers_handler,
        token::transfer_authority_handler,
        token::accept_authority_handler,
        token::fee_quote_handler,
        governance::get_config_handler,
        governance::update_config_handler,
        governance::list_proposals_handler,
        governance::create_proposal_handler,
        governance::get_proposal_handler,
        governance::cast_vote_handler,
        governance::execute_proposal_handler
    ),
    components(schemas(
        ApiResponse,
        ErrorResponse,
        ValidationErrorDetails,
        FieldError,
        Asset,
        AssetCategory,
        AssetStatus,
        AssetDocument,
        AssetHistory,
        AssetListResponse,
        StatusChange,
        Tokenization,
        Valuation,
        Verification,
        VerificationAction,
        VerificationStatus,
        IncomeDistributionFrequency,
        Role,
        CreateAssetRequest,
        UpdateAssetRequest,
        VerifyAssetRequest,
        AddValuationRequest,
        AddDocumentRequest,
        TokenizeAssetRequest,
        SetTradabilityRequest,
        DistributeIncomeRequest,
        DelistAssetRequest,
        PlatformToken,
        FeeConfig,
        TokenDistribution,
        FeeQuote,
        InitializeTokenRequest,
        UpdateFeesRequest,
        PauseTransfersRequest,
        TransferAuthorityRequest,
        GovernanceConfig,
        Proposal,
        ProposalType,
        ProposalOutcome,
        VoteRecord,
        CreateProposalRequest,
        CastVoteRequest,
        ExecuteProposalResponse,
        CsrfTokenResponse
    )),
    modifiers(&ApiKeyScheme),
    tags(
        (name = "assets", description = "Asset registry and lifecycle"),
        (name = "token", description = "Platform token and fees"),
        (name = "governance", description = "Proposals and voting"),
        (name = "security", description = "CSRF token issuance"),
        (name = "system", description = "Health and metrics")
    )
)]
pub struct ApiDoc;

struct ApiKeyScheme;

impl Modify for ApiKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// API routes only, with route-level metrics. No cross-cutting middleware.
pub fn api_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/csrf-token", get(csrf::csrf_token_handler))
        .route(
            "/api/assets",
            get(assets::list_assets_handler).post(assets::create_asset_handler),
        )
        .route("/api/assets/search", get(assets::search_assets_handler))
        .route(
            "/api/assets/category/:category",
            get(assets::assets_by_category_handler),
        )
        .route(
            "/api/assets/:id",
            get(assets::get_asset_handler)
                .put(assets::update_asset_handler)
                .delete(assets::delete_asset_handler),
        )
        .route("/api/assets/:id/history", get(assets::asset_history_handler))
        .route("/api/assets/:id/verify", post(assets::verify_asset_handler))
        .route("/api/assets/:id/valuations", post(assets::add_valuation_handler))
        .route("/api/assets/:id/documents", post(assets::add_document_handler))
        .route("/api/assets/:id/tokenize", post(assets::tokenize_asset_handler))
        .route("/api/assets/:id/tradability", post(assets::set_tradability_handler))
        .route("/api/assets/:id/income", post(assets::distribute_income_handler))
        .route("/api/assets/:id/delist", post(assets::delist_asset_handler))
        .route("/api/token", get(token::get_token_handler))
        .route("/api/token/initialize", post(token::initialize_token_handler))
        .route("/api/token/fees", axum::routing::put(token::update_fees_handler))
        .route("/api/token/pause", post(token::pause_transfers_handler))
        .route(
            "/api/token/authority/transfer",
            post(token::transfer_authority_handler),
        )
        .route(
            "/api/token/authority/accept",
            post(token::accept_authority_handler),
        )
        .route("/api/token/fee-quote", get(token::fee_quote_handler))
        .route(
            "/api/governance/config",
            get(governance::get_config_handler).put(governance::update_config_handler),
        )
        .route(
            "/api/governance/proposals",
            get(governance::list_proposals_handler).post(governance::create_proposal_handler),
        )
        .route(
            "/api/governance/proposals/:id",
            get(governance::get_proposal_handler),
        )
        .route(
            "/api/governance/proposals/:id/votes",
            post(governance::cast_vote_handler),
        )
        .route(
            "/api/governance/proposals/:id/execute",
            post(governance::execute_proposal_handler),
        )
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(app_state)
}

/// The full application: routes, Swagger UI and the middleware stack.
///
/// Request order: panic guard, CORS, request id, logging, security headers, rate limit, CSRF.
pub fn create_router(app_state: AppState) -> Router {
    let security = app_state.security.clone();
    let limiter = app_state.rate_limiter.clone();
    let cors = cors_layer(&app_state.cors_allowed_origins);

    api_routes(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(csrf_protection))
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(middleware::from_fn_with_state(security, security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .layer(CatchPanicLayer::new())
}
