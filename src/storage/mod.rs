//! Persistence seams.
//!
//! Services only see these traits; `postgres` is the production backend and `memory` backs
//! local development and the test-suite.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Asset, AssetCategory, AssetStatus, GovernanceConfig, PlatformToken, Proposal};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing filter. `page` is 1-based.
#[derive(Debug, Clone)]
pub struct AssetFilter {
    pub category: Option<AssetCategory>,
    pub status: Option<AssetStatus>,
    pub owner: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for AssetFilter {
    fn default() -> Self {
        Self {
            category: None,
            status: None,
            owner: None,
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AssetFilter {
    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.per_page as u64
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        self.category.map(|c| c == asset.category).unwrap_or(true)
            && self.status.map(|s| s == asset.status).unwrap_or(true)
            && self
                .owner
                .as_deref()
                .map(|o| o == asset.owner)
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct AssetPage {
    pub items: Vec<Asset>,
    pub total: u64,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn insert_asset(&self, asset: &Asset) -> anyhow::Result<()>;

    /// Replaces the stored record. Returns `false` when the asset does not exist.
    async fn update_asset(&self, asset: &Asset) -> anyhow::Result<bool>;

    async fn get_asset(&self, id: Uuid) -> anyhow::Result<Option<Asset>>;

    /// Returns `false` when the asset does not exist.
    async fn delete_asset(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Newest first.
    async fn list_assets(&self, filter: &AssetFilter) -> anyhow::Result<AssetPage>;

    /// Case-insensitive substring search over name, description and location.
    async fn search_assets(&self, query: &str, limit: u32) -> anyhow::Result<Vec<Asset>>;

    /// Cheap liveness probe for `/health`.
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ProposalStore: Send + Sync {
    async fn insert_proposal(&self, proposal: &Proposal) -> anyhow::Result<()>;
    async fn update_proposal(&self, proposal: &Proposal) -> anyhow::Result<bool>;
    async fn get_proposal(&self, id: Uuid) -> anyhow::Result<Option<Proposal>>;
    /// Newest first.
    async fn list_proposals(&self, active_only: bool) -> anyhow::Result<Vec<Proposal>>;
    async fn load_governance_config(&self) -> anyhow::Result<Option<GovernanceConfig>>;
    async fn save_governance_config(&self, config: &GovernanceConfig) -> anyhow::Result<()>;
}

#[async_trait]
pub trait PlatformTokenStore: Send + Sync {
    async fn load_platform_token(&self) -> anyhow::Result<Option<PlatformToken>>;
    async fn save_platform_token(&self, token: &PlatformToken) -> anyhow::Result<()>;
}
