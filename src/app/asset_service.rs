//! Asset registry operations.
//!
//! Writes to one asset are serialised by a per-asset lock; reads go straight to the store. Operations with an
//! on-chain side apply the change to a copy, submit the transaction, and only then persist, so a
//! failed submission leaves the stored record untouched. Tokenization is the exception: it
//! persists `tokenizing` first and rolls back to `verified` when the ledger fails.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::{Clock, ServiceError, ServiceResult};
use crate::crypto::hashing::canonical_digest;
use crate::domain::asset::{validate_description, validate_name};
use crate::domain::{
    Asset, AssetCategory, AssetDocument, AssetStatus, DomainError, DomainResult, NewAsset,
    Principal, Role, StatusChange, Tokenization, TokenizationParams, Valuation, VerificationAction,
    VerificationStatus,
};
use crate::infra::metrics::ASSET_TRANSITIONS_TOTAL;
use crate::infra::solana::{AssetTokenRequest, LedgerError, TokenLedger};
use crate::storage::{AssetFilter, AssetPage, AssetStore, MAX_PAGE_SIZE};

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AssetUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<AssetCategory>,
    /// An empty string clears the location.
    pub location: Option<String>,
    pub valuation: Option<u64>,
    pub metadata: Option<JsonValue>,
    pub status: Option<AssetStatus>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub url: String,
    pub sha256: Option<String>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct AssetHistory {
    pub asset_id: Uuid,
    pub valuation_history: Vec<Valuation>,
    pub status_history: Vec<StatusChange>,
}

pub struct AssetService {
    store: Arc<dyn AssetStore>,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    locks: AssetLocks,
}

/// One async lock per asset id, so a slow ledger call only blocks writers of the same asset.
/// Entries nobody holds are dropped on the next acquisition.
#[derive(Default)]
struct AssetLocks {
    locks: SyncMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AssetLocks {
    async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn record_transition(to: AssetStatus) {
    metrics::counter!(ASSET_TRANSITIONS_TOTAL, "to" => to.as_str()).increment(1);
}

/// Asset managers may only touch assets they listed; other writer roles are gated at the route.
fn ensure_can_manage(principal: &Principal, asset: &Asset) -> DomainResult<()> {
    if principal.role == Role::AssetManager && asset.owner != principal.subject {
        return Err(DomainError::Unauthorized(format!(
            "{} does not own asset {}",
            principal.subject, asset.id
        )));
    }
    Ok(())
}

fn verification_status_for(status: AssetStatus) -> Option<VerificationStatus> {
    match status {
        AssetStatus::Pending => Some(VerificationStatus::Unverified),
        AssetStatus::Verifying => Some(VerificationStatus::InReview),
        AssetStatus::Verified => Some(VerificationStatus::Approved),
        AssetStatus::Rejected => Some(VerificationStatus::Rejected),
        _ => None,
    }
}

/// Metadata URI stored on chain; the fragment pins the metadata contents.
pub fn token_uri(asset: &Asset) -> String {
    format!(
        "realstack://assets/{}#{}",
        asset.id,
        canonical_digest(&asset.metadata)
    )
}

fn tokenized_account(asset: &Asset) -> DomainResult<String> {
    asset
        .tokenization
        .as_ref()
        .map(|t| t.token_account.clone())
        .ok_or(DomainError::AssetNotTokenized)
}

impl AssetService {
    pub fn new(
        store: Arc<dyn AssetStore>,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
            locks: AssetLocks::default(),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Asset> {
        self.store
            .get_asset(id)
            .await?
            .ok_or(ServiceError::Domain(DomainError::AssetNotFound(id)))
    }

    async fn persist(&self, asset: &Asset) -> ServiceResult<()> {
        if !self.store.update_asset(asset).await? {
            return Err(DomainError::AssetNotFound(asset.id).into());
        }
        Ok(())
    }

    pub async fn list(&self, filter: AssetFilter) -> ServiceResult<AssetPage> {
        if filter.page == 0 {
            return Err(DomainError::InvalidParameters("page must be at least 1".to_string()).into());
        }
        if filter.per_page == 0 || filter.per_page > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidParameters(format!(
                "per_page must be between 1 and {}",
                MAX_PAGE_SIZE
            ))
            .into());
        }
        Ok(self.store.list_assets(&filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Asset> {
        self.load(id).await
    }

    pub async fn by_category(
        &self,
        category: AssetCategory,
        page: u32,
        per_page: u32,
    ) -> ServiceResult<AssetPage> {
        self.list(AssetFilter {
            category: Some(category),
            page,
            per_page,
            ..AssetFilter::default()
        })
        .await
    }

    pub async fn search(&self, query: &str, limit: u32) -> ServiceResult<Vec<Asset>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::InvalidParameters("search query must not be empty".to_string()).into());
        }
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        Ok(self.store.search_assets(query, limit).await?)
    }

    pub async fn create(&self, principal: &Principal, input: NewAsset) -> ServiceResult<Asset> {
        let asset = Asset::new(input, &principal.subject, self.now())?;
        self.store.insert_asset(&asset).await?;
        record_transition(AssetStatus::Pending);
        info!(
            asset_id = %asset.id,
            owner = %asset.owner,
            category = %asset.category,
            valuation = asset.valuation,
            "asset listed"
        );
        Ok(asset)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        update: AssetUpdate,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        ensure_can_manage(principal, &asset)?;
        if asset.status.is_terminal() {
            return Err(DomainError::InvalidParameters("delisted assets cannot be modified".to_string()).into());
        }
        let now = self.now();

        if let Some(name) = update.name {
            validate_name(&name)?;
            asset.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            validate_description(&description)?;
            asset.description = description;
        }
        if let Some(category) = update.category {
            if asset.tokenization.is_some() && category != asset.category {
                return Err(DomainError::InvalidParameters(
                    "category cannot change once the asset is tokenized".to_string(),
                )
                .into());
            }
            asset.category = category;
        }
        if let Some(location) = update.location {
            asset.location = Some(location.trim().to_string()).filter(|l| !l.is_empty());
        }
        if let Some(metadata) = update.metadata {
            if !metadata.is_object() {
                return Err(DomainError::InvalidParameters("metadata must be a JSON object".to_string()).into());
            }
            asset.metadata = metadata;
        }
        asset.updated_at = now;

        let mut revalued = false;
        if let Some(valuation) = update.valuation {
            if valuation != asset.valuation {
                asset.record_valuation(valuation, "update", &principal.subject, None, now)?;
                revalued = true;
            }
        }

        if let Some(next) = update.status {
            if next != asset.status {
                if matches!(
                    next,
                    AssetStatus::Tokenizing | AssetStatus::Tokenized | AssetStatus::Delisted
                ) {
                    return Err(DomainError::InvalidParameters(format!(
                        "status '{}' can only be reached through its dedicated operation",
                        next
                    ))
                    .into());
                }
                if !principal.is_admin() && next != AssetStatus::Pending {
                    return Err(DomainError::Unauthorized(
                        "only admins may set a verification outcome through an update".to_string(),
                    )
                    .into());
                }
                asset.transition(next, &principal.subject, update.reason, now)?;
                if let Some(vs) = verification_status_for(next) {
                    asset.verification_status = vs;
                }
                record_transition(next);
            }
        }

        if revalued && asset.status == AssetStatus::Tokenized {
            self.push_valuation(&asset).await?;
        }
        self.persist(&asset).await?;
        info!(asset_id = %asset.id, actor = %principal.subject, "asset updated");
        Ok(asset)
    }

    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let _guard = self.locks.acquire(id).await;
        let asset = self.load(id).await?;
        if asset.tokenization.as_ref().map(|t| !t.is_burned).unwrap_or(false) {
            // A live token would be orphaned on chain; delist first.
            return Err(DomainError::AssetAlreadyTokenized.into());
        }
        if !self.store.delete_asset(id).await? {
            return Err(DomainError::AssetNotFound(id).into());
        }
        info!(asset_id = %id, "asset deleted");
        Ok(())
    }

    pub async fn history(&self, id: Uuid) -> ServiceResult<AssetHistory> {
        let asset = self.load(id).await?;
        Ok(AssetHistory {
            asset_id: asset.id,
            valuation_history: asset.valuation_history,
            status_history: asset.status_history,
        })
    }

    pub async fn verify(
        &self,
        principal: &Principal,
        id: Uuid,
        action: VerificationAction,
        notes: Option<String>,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        let status = asset.apply_verification(action, &principal.subject, notes, self.now())?;
        self.persist(&asset).await?;
        record_transition(status);
        info!(asset_id = %id, verifier = %principal.subject, ?action, status = %status, "verification recorded");
        Ok(asset)
    }

    pub async fn add_valuation(
        &self,
        principal: &Principal,
        id: Uuid,
        amount: u64,
        source: &str,
        notes: Option<String>,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        ensure_can_manage(principal, &asset)?;
        asset.record_valuation(amount, source, &principal.subject, notes, self.now())?;
        if asset.status == AssetStatus::Tokenized {
            self.push_valuation(&asset).await?;
        }
        self.persist(&asset).await?;
        info!(asset_id = %id, amount, source, "valuation recorded");
        Ok(asset)
    }

    async fn push_valuation(&self, asset: &Asset) -> ServiceResult<()> {
        let token = asset
            .tokenization
            .as_ref()
            .ok_or(DomainError::AssetNotTokenized)?;
        self.ledger
            .update_asset_valuation(&token.token_account, asset.valuation, token.current_share_price)
            .await?;
        Ok(())
    }

    pub async fn add_document(
        &self,
        principal: &Principal,
        id: Uuid,
        document: NewDocument,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        ensure_can_manage(principal, &asset)?;
        if asset.status.is_terminal() {
            return Err(DomainError::InvalidParameters("delisted assets cannot be modified".to_string()).into());
        }
        let now = self.now();
        asset.documents.push(AssetDocument {
            id: Uuid::new_v4(),
            name: document.name,
            url: document.url,
            sha256: document.sha256.map(|h| h.to_lowercase()),
            uploaded_by: principal.subject.clone(),
            uploaded_at: now,
        });
        asset.updated_at = now;
        self.persist(&asset).await?;
        Ok(asset)
    }

    pub async fn tokenize(
        &self,
        principal: &Principal,
        id: Uuid,
        params: TokenizationParams,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        ensure_can_manage(principal, &asset)?;
        match asset.status {
            AssetStatus::Verified => {}
            AssetStatus::Tokenizing | AssetStatus::Tokenized => {
                return Err(DomainError::AssetAlreadyTokenized.into())
            }
            _ => return Err(DomainError::AssetNotVerified.into()),
        }
        params.validate(asset.valuation)?;
        // Records listed before the byte limits existed may still exceed the account size.
        validate_name(&asset.name)?;
        validate_description(&asset.description)?;

        asset.transition(AssetStatus::Tokenizing, &principal.subject, None, self.now())?;
        self.persist(&asset).await?;
        record_transition(AssetStatus::Tokenizing);

        let request = AssetTokenRequest {
            asset_id: asset.id,
            name: asset.name.clone(),
            symbol: params.symbol.clone(),
            category: asset.category,
            description: asset.description.clone(),
            uri: token_uri(&asset),
            valuation: asset.valuation,
            total_shares: params.total_shares,
            share_price: params.share_price,
        };
        let receipt = match self.ledger.create_asset_token(&request).await {
            Ok(receipt) => receipt,
            Err(e) => return self.rollback_tokenizing(asset, principal, e).await,
        };
        if let Err(e) = self.ledger.verify_asset(&receipt.token_account).await {
            warn!(
                asset_id = %id,
                token_account = %receipt.token_account,
                "asset token created but left unverified on chain"
            );
            return self.rollback_tokenizing(asset, principal, e).await;
        }

        let now = self.now();
        asset.tokenization = Some(Tokenization {
            symbol: params.symbol,
            token_account: receipt.token_account,
            signature: receipt.signature,
            total_shares: params.total_shares,
            initial_share_price: params.share_price,
            current_share_price: params.share_price,
            is_tradable: false,
            is_burned: false,
            income_distribution_frequency: params.income_distribution_frequency,
            last_income_distribution: None,
            total_income_distributed: 0,
            tokenized_at: now,
        });
        asset.transition(AssetStatus::Tokenized, &principal.subject, None, now)?;
        self.persist(&asset).await?;
        record_transition(AssetStatus::Tokenized);
        info!(asset_id = %id, ledger = self.ledger.name(), "asset tokenized");
        Ok(asset)
    }

    async fn rollback_tokenizing(
        &self,
        mut asset: Asset,
        principal: &Principal,
        error: LedgerError,
    ) -> ServiceResult<Asset> {
        asset.transition(
            AssetStatus::Verified,
            &principal.subject,
            Some(format!("tokenization failed: {}", error)),
            self.now(),
        )?;
        self.persist(&asset).await?;
        record_transition(AssetStatus::Verified);
        warn!(asset_id = %asset.id, error = %error, "tokenization rolled back");
        Err(error.into())
    }

    pub async fn set_tradability(
        &self,
        principal: &Principal,
        id: Uuid,
        is_tradable: bool,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        ensure_can_manage(principal, &asset)?;
        asset.set_tradability(is_tradable, self.now())?;
        let account = tokenized_account(&asset)?;
        self.ledger.toggle_tradability(&account, is_tradable).await?;
        self.persist(&asset).await?;
        info!(asset_id = %id, is_tradable, "tradability changed");
        Ok(asset)
    }

    pub async fn distribute_income(
        &self,
        principal: &Principal,
        id: Uuid,
        amount: u64,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        ensure_can_manage(principal, &asset)?;
        let total = asset.distribute_income(amount, self.now())?;
        let account = tokenized_account(&asset)?;
        self.ledger.distribute_income(&account, amount).await?;
        self.persist(&asset).await?;
        info!(asset_id = %id, amount, total, "income distributed");
        Ok(asset)
    }

    pub async fn delist(
        &self,
        principal: &Principal,
        id: Uuid,
        reason: Option<String>,
    ) -> ServiceResult<Asset> {
        let _guard = self.locks.acquire(id).await;
        let mut asset = self.load(id).await?;
        if !asset.status.can_transition_to(AssetStatus::Delisted) {
            return Err(DomainError::InvalidTransition {
                from: asset.status,
                to: AssetStatus::Delisted,
            }
            .into());
        }
        let now = self.now();
        if asset.tokenization.as_ref().map(|t| !t.is_burned).unwrap_or(false) {
            let account = tokenized_account(&asset)?;
            self.ledger.burn_asset_token(&account).await?;
            asset.burn_token(now)?;
        }
        asset.transition(AssetStatus::Delisted, &principal.subject, reason, now)?;
        self.persist(&asset).await?;
        record_transition(AssetStatus::Delisted);
        info!(asset_id = %id, actor = %principal.subject, "asset delisted");
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SystemClock;
    use crate::domain::IncomeDistributionFrequency;
    use crate::infra::solana::InMemoryLedger;
    use crate::storage::MemoryStore;
    use serde_json::json;

    struct Fixture {
        service: AssetService,
        ledger: Arc<InMemoryLedger>,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new());
        let service = AssetService::new(
            Arc::new(MemoryStore::new()),
            ledger.clone(),
            Arc::new(SystemClock),
        );
        Fixture { service, ledger }
    }

    fn manager() -> Principal {
        Principal::new("mgr-1", Role::AssetManager)
    }

    fn verifier() -> Principal {
        Principal::new("ver-1", Role::Verifier)
    }

    fn new_asset() -> NewAsset {
        NewAsset {
            name: "Harbor Loft".into(),
            description: "Two-bedroom loft".into(),
            category: AssetCategory::RealEstate,
            location: Some("Lisbon".into()),
            valuation: 1_000_000,
            metadata: json!({ "sqm": 120 }),
        }
    }

    fn params() -> TokenizationParams {
        TokenizationParams {
            symbol: "HLOFT".into(),
            total_shares: 1_000,
            share_price: 1_000,
            income_distribution_frequency: IncomeDistributionFrequency::Monthly,
        }
    }

    async fn verified(f: &Fixture) -> Asset {
        let a = f.service.create(&manager(), new_asset()).await.unwrap();
        f.service
            .verify(&verifier(), a.id, VerificationAction::StartReview, None)
            .await
            .unwrap();
        f.service
            .verify(&verifier(), a.id, VerificationAction::Approve, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn tokenize_happy_path_records_chain_receipt() {
        let f = fixture();
        let a = verified(&f).await;
        let t = f.service.tokenize(&manager(), a.id, params()).await.unwrap();
        assert_eq!(t.status, AssetStatus::Tokenized);
        let token = t.tokenization.unwrap();
        let acct = f.ledger.account(&token.token_account).unwrap();
        assert!(acct.is_verified);
        assert!(acct.request.uri.starts_with("realstack://assets/"));
    }

    #[tokio::test]
    async fn tokenize_failure_rolls_back_to_verified() {
        let f = fixture();
        let a = verified(&f).await;
        f.ledger.fail_on("create_asset_token");
        let err = f.service.tokenize(&manager(), a.id, params()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Ledger(_)));

        let stored = f.service.get(a.id).await.unwrap();
        assert_eq!(stored.status, AssetStatus::Verified);
        assert!(stored.tokenization.is_none());
        let last = stored.status_history.last().unwrap();
        assert_eq!(last.from, Some(AssetStatus::Tokenizing));
        assert!(last.reason.as_deref().unwrap().contains("tokenization failed"));
    }

    #[tokio::test]
    async fn tokenize_requires_verified_asset() {
        let f = fixture();
        let a = f.service.create(&manager(), new_asset()).await.unwrap();
        let err = f.service.tokenize(&manager(), a.id, params()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::AssetNotVerified)));
    }

    #[tokio::test]
    async fn managers_only_touch_their_own_assets() {
        let f = fixture();
        let a = f.service.create(&manager(), new_asset()).await.unwrap();
        let other = Principal::new("mgr-2", Role::AssetManager);
        let err = f
            .service
            .update(&other, a.id, AssetUpdate { name: Some("Mine".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Unauthorized(_))));

        let admin = Principal::new("root", Role::Admin);
        let updated = f
            .service
            .update(&admin, a.id, AssetUpdate { name: Some("Renamed".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
    }

    #[tokio::test]
    async fn update_cannot_jump_to_tokenized() {
        let f = fixture();
        let a = verified(&f).await;
        let err = f
            .service
            .update(
                &manager(),
                a.id,
                AssetUpdate { status: Some(AssetStatus::Tokenized), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn revaluation_of_tokenized_asset_reaches_chain() {
        let f = fixture();
        let a = verified(&f).await;
        let t = f.service.tokenize(&manager(), a.id, params()).await.unwrap();
        let account = t.tokenization.unwrap().token_account;

        let revalued = f
            .service
            .add_valuation(&verifier(), a.id, 2_000_000, "appraisal", None)
            .await
            .unwrap();
        assert_eq!(revalued.tokenization.unwrap().current_share_price, 2_000);
        assert_eq!(f.ledger.account(&account).unwrap().current_share_price, 2_000);

        f.ledger.fail_on("update_asset_valuation");
        assert!(f
            .service
            .add_valuation(&verifier(), a.id, 3_000_000, "appraisal", None)
            .await
            .is_err());
        assert_eq!(f.service.get(a.id).await.unwrap().valuation, 2_000_000);
    }

    #[tokio::test]
    async fn delist_burns_live_token() {
        let f = fixture();
        let a = verified(&f).await;
        let t = f.service.tokenize(&manager(), a.id, params()).await.unwrap();
        let account = t.tokenization.unwrap().token_account;
        let admin = Principal::new("root", Role::Admin);

        assert!(matches!(
            f.service.delete(a.id).await,
            Err(ServiceError::Domain(DomainError::AssetAlreadyTokenized))
        ));

        let d = f.service.delist(&admin, a.id, Some("sold".into())).await.unwrap();
        assert_eq!(d.status, AssetStatus::Delisted);
        assert!(d.tokenization.unwrap().is_burned);
        assert!(f.ledger.account(&account).unwrap().is_burned);

        assert!(f.service.delist(&admin, a.id, None).await.is_err());
        f.service.delete(a.id).await.unwrap();
    }

    #[tokio::test]
    async fn income_reaches_chain_before_it_is_stored() {
        let f = fixture();
        let a = verified(&f).await;
        let t = f.service.tokenize(&manager(), a.id, params()).await.unwrap();
        let account = t.tokenization.unwrap().token_account;

        let paid = f
            .service
            .distribute_income(&manager(), a.id, 5_000)
            .await
            .unwrap();
        assert_eq!(paid.tokenization.unwrap().total_income_distributed, 5_000);
        assert_eq!(f.ledger.account(&account).unwrap().total_income_distributed, 5_000);

        f.ledger.fail_on("distribute_income");
        let err = f
            .service
            .distribute_income(&manager(), a.id, 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Ledger(_)));
        let stored = f.service.get(a.id).await.unwrap();
        assert_eq!(stored.tokenization.unwrap().total_income_distributed, 5_000);
        assert_eq!(f.ledger.account(&account).unwrap().total_income_distributed, 5_000);
    }

    #[tokio::test]
    async fn tokenize_refuses_names_too_long_for_the_chain_account() {
        let f = fixture();
        let mut a = verified(&f).await;
        // 100 characters but 200 bytes.
        a.name = "é".repeat(100);
        assert!(f.service.store().update_asset(&a).await.unwrap());

        let err = f.service.tokenize(&manager(), a.id, params()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidParameters(_))));
        assert_eq!(f.ledger.account_count(), 0);
        assert_eq!(f.service.get(a.id).await.unwrap().status, AssetStatus::Verified);
    }

    #[tokio::test]
    async fn asset_locks_are_independent_per_asset() {
        use std::time::Duration as StdDuration;
        use tokio::time::timeout;

        let locks = AssetLocks::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let held = locks.acquire(a).await;

        assert!(timeout(StdDuration::from_millis(50), locks.acquire(b)).await.is_ok());
        assert!(timeout(StdDuration::from_millis(50), locks.acquire(a)).await.is_err());

        drop(held);
        let again = timeout(StdDuration::from_millis(50), locks.acquire(a))
            .await
            .unwrap();
        assert_eq!(locks.tracked(), 1);
        drop(again);
        let _other = locks.acquire(b).await;
        assert_eq!(locks.tracked(), 1);
    }

    #[tokio::test]
    async fn list_rejects_bad_pagination_and_search_rejects_empty() {
        let f = fixture();
        let bad = AssetFilter { per_page: 101, ..AssetFilter::default() };
        assert!(f.service.list(bad).await.is_err());
        let bad = AssetFilter { page: 0, ..AssetFilter::default() };
        assert!(f.service.list(bad).await.is_err());
        assert!(f.service.search("   ", 10).await.is_err());
    }
}
