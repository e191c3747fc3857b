//! In-memory store used by tests and `STORE_BACKEND=memory`.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Asset, GovernanceConfig, PlatformToken, Proposal};
use crate::storage::{AssetFilter, AssetPage, AssetStore, PlatformTokenStore, ProposalStore};

#[derive(Default)]
pub struct MemoryStore {
    assets: RwLock<HashMap<Uuid, Asset>>,
    proposals: RwLock<HashMap<Uuid, Proposal>>,
    governance_config: RwLock<Option<GovernanceConfig>>,
    platform_token: RwLock<Option<PlatformToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(items: &mut [Asset]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn insert_asset(&self, asset: &Asset) -> anyhow::Result<()> {
        let mut assets = self.assets.write().await;
        if assets.contains_key(&asset.id) {
            return Err(anyhow::anyhow!("asset {} already exists", asset.id));
        }
        assets.insert(asset.id, asset.clone());
        Ok(())
    }

    async fn update_asset(&self, asset: &Asset) -> anyhow::Result<bool> {
        let mut assets = self.assets.write().await;
        match assets.get_mut(&asset.id) {
            Some(slot) => {
                *slot = asset.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_asset(&self, id: Uuid) -> anyhow::Result<Option<Asset>> {
        Ok(self.assets.read().await.get(&id).cloned())
    }

    async fn delete_asset(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.assets.write().await.remove(&id).is_some())
    }

    async fn list_assets(&self, filter: &AssetFilter) -> anyhow::Result<AssetPage> {
        let assets = self.assets.read().await;
        let mut matching: Vec<Asset> = assets
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        newest_first(&mut matching);
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();
        Ok(AssetPage { items, total })
    }

    async fn search_assets(&self, query: &str, limit: u32) -> anyhow::Result<Vec<Asset>> {
        let needle = query.to_lowercase();
        let assets = self.assets.read().await;
        let mut hits: Vec<Asset> = assets
            .values()
            .filter(|a| a.matches_query(&needle))
            .cloned()
            .collect();
        newest_first(&mut hits);
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn insert_proposal(&self, proposal: &Proposal) -> anyhow::Result<()> {
        self.proposals
            .write()
            .await
            .insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn update_proposal(&self, proposal: &Proposal) -> anyhow::Result<bool> {
        let mut proposals = self.proposals.write().await;
        match proposals.get_mut(&proposal.id) {
            Some(slot) => {
                *slot = proposal.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_proposal(&self, id: Uuid) -> anyhow::Result<Option<Proposal>> {
        Ok(self.proposals.read().await.get(&id).cloned())
    }

    async fn list_proposals(&self, active_only: bool) -> anyhow::Result<Vec<Proposal>> {
        let proposals = self.proposals.read().await;
        let mut out: Vec<Proposal> = proposals
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn load_governance_config(&self) -> anyhow::Result<Option<GovernanceConfig>> {
        Ok(self.governance_config.read().await.clone())
    }

    async fn save_governance_config(&self, config: &GovernanceConfig) -> anyhow::Result<()> {
        *self.governance_config.write().await = Some(config.clone());
        Ok(())
    }
}

#[async_trait]
impl PlatformTokenStore for MemoryStore {
    async fn load_platform_token(&self) -> anyhow::Result<Option<PlatformToken>> {
        Ok(self.platform_token.read().await.clone())
    }

    async fn save_platform_token(&self, token: &PlatformToken) -> anyhow::Result<()> {
        *self.platform_token.write().await = Some(token.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetCategory, NewAsset};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn asset(name: &str, category: AssetCategory, offset_secs: i64) -> Asset {
        Asset::new(
            NewAsset {
                name: name.to_string(),
                description: format!("{} description", name),
                category,
                location: None,
                valuation: 1_000,
                metadata: json!({}),
            },
            "owner-1",
            Utc::now() + Duration::seconds(offset_secs),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn list_filters_and_paginates_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_asset(&asset(&format!("art-{}", i), AssetCategory::Art, i))
                .await
                .unwrap();
        }
        store
            .insert_asset(&asset("villa", AssetCategory::RealEstate, 10))
            .await
            .unwrap();

        let page = store
            .list_assets(&AssetFilter {
                category: Some(AssetCategory::Art),
                page: 1,
                per_page: 2,
                ..AssetFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "art-4");

        let last = store
            .list_assets(&AssetFilter {
                category: Some(AssetCategory::Art),
                page: 3,
                per_page: 2,
                ..AssetFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].name, "art-0");
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = MemoryStore::new();
        let a = asset("coin", AssetCategory::Collectible, 0);
        assert!(!store.update_asset(&a).await.unwrap());
        store.insert_asset(&a).await.unwrap();
        assert!(store.insert_asset(&a).await.is_err());
        assert!(store.update_asset(&a).await.unwrap());
        assert!(store.delete_asset(a.id).await.unwrap());
        assert!(!store.delete_asset(a.id).await.unwrap());
    }
}
