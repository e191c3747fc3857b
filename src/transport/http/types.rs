use axum::Json;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::app::{
    AssetService, AssetUpdate, Clock, GovernanceService, NewDocument, NewProposal,
    TokenomicsService,
};
use crate::domain::{
    Asset, AssetCategory, AssetStatus, FeeConfig, IncomeDistributionFrequency, NewAsset, Proposal,
    ProposalOutcome, ProposalType, TokenizationParams, VerificationAction,
};
use crate::infra::config::RateLimitConfig;
use crate::infra::solana::TokenLedger;
use crate::storage::{AssetPage, AssetStore, PlatformTokenStore, ProposalStore};
use crate::transport::http::auth::ApiKeyRegistry;
use crate::transport::http::error::{ApiError, ApiResult};
use crate::transport::http::middleware::SecuritySettings;
use crate::transport::http::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub assets: Arc<AssetService>,
    pub governance: Arc<GovernanceService>,
    pub tokenomics: Arc<TokenomicsService>,
    pub api_keys: Arc<ApiKeyRegistry>,
    pub rate_limiter: Arc<ApiRateLimiter>,
    pub security: SecuritySettings,
    pub cors_allowed_origins: Arc<Vec<String>>,
    /// `None` when metrics are disabled; `/metrics` then answers 503.
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Wires every service onto one store that backs all three record kinds.
    pub fn new<S>(
        store: Arc<S>,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
        api_keys: ApiKeyRegistry,
        rate_limit: &RateLimitConfig,
    ) -> anyhow::Result<Self>
    where
        S: AssetStore + ProposalStore + PlatformTokenStore + 'static,
    {
        let asset_store: Arc<dyn AssetStore> = store.clone();
        let proposal_store: Arc<dyn ProposalStore> = store.clone();
        let token_store: Arc<dyn PlatformTokenStore> = store;
        Ok(Self {
            assets: Arc::new(AssetService::new(asset_store, ledger, clock.clone())),
            governance: Arc::new(GovernanceService::new(proposal_store, clock.clone())),
            tokenomics: Arc::new(TokenomicsService::new(token_store, clock)),
            api_keys: Arc::new(api_keys),
            rate_limiter: Arc::new(ApiRateLimiter::new(rate_limit)?),
            security: SecuritySettings::default(),
            cors_allowed_origins: Arc::new(Vec::new()),
            prometheus_handle: None,
        })
    }

    pub fn with_security(mut self, security: SecuritySettings) -> Self {
        self.security = security;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_allowed_origins = Arc::new(origins);
        self
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(handle);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(data: T) -> ApiResult<Json<ApiResponse>> {
        let data = serde_json::to_value(data)
            .map_err(|e| ApiError::Internal(format!("failed to encode response: {}", e)))?;
        Ok(Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }))
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn json_object(value: &JsonValue) -> Result<(), ValidationError> {
    if !value.is_object() {
        let mut err = ValidationError::new("type");
        err.message = Some("must be a JSON object".into());
        return Err(err);
    }
    Ok(())
}

fn sha256_hex(value: &str) -> Result<(), ValidationError> {
    if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        let mut err = ValidationError::new("sha256");
        err.message = Some("must be 64 hex characters".into());
        return Err(err);
    }
    Ok(())
}

fn token_symbol(value: &str) -> Result<(), ValidationError> {
    if !value.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        let mut err = ValidationError::new("symbol");
        err.message = Some("must contain only A-Z and 0-9".into());
        return Err(err);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct CreateAssetRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    pub category: AssetCategory,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    /// USD cents.
    #[validate(range(min = 1))]
    pub valuation: u64,
    #[validate(custom = "json_object")]
    #[schema(value_type = Object)]
    pub metadata: Option<JsonValue>,
}

impl From<CreateAssetRequest> for NewAsset {
    fn from(req: CreateAssetRequest) -> Self {
        NewAsset {
            name: req.name,
            description: req.description,
            category: req.category,
            location: req.location,
            valuation: req.valuation,
            metadata: req.metadata.unwrap_or_else(|| JsonValue::Object(Default::default())),
        }
    }
}

/// Omitted fields are left unchanged.
#[derive(Deserialize, Debug, Default, Validate, ToSchema)]
pub struct UpdateAssetRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub category: Option<AssetCategory>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(min = 1))]
    pub valuation: Option<u64>,
    #[validate(custom = "json_object")]
    #[schema(value_type = Object)]
    pub metadata: Option<JsonValue>,
    pub status: Option<AssetStatus>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

impl From<UpdateAssetRequest> for AssetUpdate {
    fn from(req: UpdateAssetRequest) -> Self {
        AssetUpdate {
            name: req.name,
            description: req.description,
            category: req.category,
            location: req.location,
            valuation: req.valuation,
            metadata: req.metadata,
            status: req.status,
            reason: req.reason,
        }
    }
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAssetsQuery {
    pub category: Option<AssetCategory>,
    pub status: Option<AssetStatus>,
    pub owner: Option<String>,
    /// 1-based.
    pub page: Option<u32>,
    /// 1..=100, default 20.
    pub per_page: Option<u32>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against name, description and location.
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct AssetListResponse {
    pub items: Vec<Asset>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl AssetListResponse {
    pub fn from_page(page: AssetPage, page_number: u32, per_page: u32) -> Self {
        Self {
            items: page.items,
            total: page.total,
            page: page_number,
            per_page,
        }
    }
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct VerifyAssetRequest {
    pub action: VerificationAction,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct AddValuationRequest {
    #[validate(range(min = 1))]
    pub amount: u64,
    /// e.g. "appraisal", "market".
    #[validate(length(min = 1, max = 50), custom = "not_blank")]
    pub source: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct AddDocumentRequest {
    #[validate(length(min = 1, max = 200), custom = "not_blank")]
    pub name: String,
    #[validate(url, length(max = 2048))]
    pub url: String,
    #[validate(custom = "sha256_hex")]
    pub sha256: Option<String>,
}

impl From<AddDocumentRequest> for NewDocument {
    fn from(req: AddDocumentRequest) -> Self {
        NewDocument {
            name: req.name.trim().to_string(),
            url: req.url,
            sha256: req.sha256,
        }
    }
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct TokenizeAssetRequest {
    #[validate(length(min = 1, max = 10), custom = "token_symbol")]
    pub symbol: String,
    #[validate(range(min = 1, max = 1000000000))]
    pub total_shares: u64,
    /// USD cents per share.
    #[validate(range(min = 1))]
    pub share_price: u64,
    #[serde(default)]
    pub income_distribution_frequency: IncomeDistributionFrequency,
}

impl From<TokenizeAssetRequest> for TokenizationParams {
    fn from(req: TokenizeAssetRequest) -> Self {
        TokenizationParams {
            symbol: req.symbol,
            total_shares: req.total_shares,
            share_price: req.share_price,
            income_distribution_frequency: req.income_distribution_frequency,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SetTradabilityRequest {
    pub is_tradable: bool,
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct DistributeIncomeRequest {
    #[validate(range(min = 1))]
    pub amount: u64,
}

#[derive(Deserialize, Debug, Default, Validate, ToSchema)]
pub struct DelistAssetRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Platform token
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct InitializeTokenRequest {
    #[validate(length(min = 1, max = 32), custom = "not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 10), custom = "token_symbol")]
    pub symbol: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub uri: String,
    #[validate(range(min = 1))]
    pub total_supply: u64,
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct UpdateFeesRequest {
    /// Basis points, capped at 1000 (10%).
    #[validate(range(max = 1000))]
    pub transaction_fee_bps: u16,
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub fee_recipient: String,
    pub fees_enabled: bool,
}

impl From<UpdateFeesRequest> for FeeConfig {
    fn from(req: UpdateFeesRequest) -> Self {
        FeeConfig {
            transaction_fee_bps: req.transaction_fee_bps,
            fee_recipient: req.fee_recipient,
            fees_enabled: req.fees_enabled,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct PauseTransfersRequest {
    pub paused: bool,
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct TransferAuthorityRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub new_authority: String,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeeQuoteQuery {
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct CreateProposalRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub title: String,
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    #[serde(default)]
    pub proposal_type: ProposalType,
    pub voting_ends_at: DateTime<Utc>,
}

impl From<CreateProposalRequest> for NewProposal {
    fn from(req: CreateProposalRequest) -> Self {
        NewProposal {
            title: req.title,
            description: req.description,
            proposal_type: req.proposal_type,
            voting_ends_at: req.voting_ends_at,
        }
    }
}

#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct CastVoteRequest {
    pub vote_yes: bool,
    #[validate(range(min = 1))]
    pub vote_weight: u64,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProposalListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ExecuteProposalResponse {
    pub proposal: Proposal,
    pub outcome: ProposalOutcome,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: JsonValue) -> CreateAssetRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn create_request_validation() {
        let ok = create(json!({
            "name": "Harbor Loft",
            "category": "real_estate",
            "valuation": 10_000_000u64,
            "metadata": { "sqm": 120 }
        }));
        assert!(ok.validate().is_ok());

        let bad = create(json!({
            "name": "   ",
            "category": "art",
            "valuation": 0,
            "metadata": [1, 2]
        }));
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("valuation"));
        assert!(fields.contains_key("metadata"));
    }

    #[test]
    fn unknown_category_fails_to_deserialize() {
        let res: Result<CreateAssetRequest, _> = serde_json::from_value(json!({
            "name": "x",
            "category": "spaceship",
            "valuation": 1
        }));
        assert!(res.is_err());
    }

    #[test]
    fn document_and_symbol_checks() {
        let doc: AddDocumentRequest = serde_json::from_value(json!({
            "name": "Deed",
            "url": "not a url",
            "sha256": "xyz"
        }))
        .unwrap();
        let errors = doc.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("url"));
        assert!(errors.field_errors().contains_key("sha256"));

        let tok: TokenizeAssetRequest = serde_json::from_value(json!({
            "symbol": "hloft",
            "total_shares": 1000,
            "share_price": 1000
        }))
        .unwrap();
        assert!(tok.validate().unwrap_err().field_errors().contains_key("symbol"));
    }
}
