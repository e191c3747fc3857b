//! PostgreSQL backend.
//!
//! Records are kept as JSONB documents next to the handful of columns used for filtering and
//! ordering, so schema changes in the domain types need no migration.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Asset, GovernanceConfig, PlatformToken, Proposal};
use crate::storage::{AssetFilter, AssetPage, AssetStore, PlatformTokenStore, ProposalStore};

const GOVERNANCE_CONFIG_KEY: &str = "governance_config";
const PLATFORM_TOKEN_KEY: &str = "platform_token";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and creates the tables if they do not exist yet.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to DATABASE_URL")?;
        let store = Self { pool };
        store.ensure_schema().await?;
        info!(max_connections, "connected to postgres");
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS assets (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                status TEXT NOT NULL,
                owner TEXT NOT NULL,
                document JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS assets_category_idx ON assets (category)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS assets_created_at_idx ON assets (created_at DESC)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS governance_proposals (
                id UUID PRIMARY KEY,
                is_active BOOLEAN NOT NULL,
                document JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // Singleton documents (platform token, governance config).
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS realstack_settings (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_setting(&self, key: &str) -> anyhow::Result<Option<JsonValue>> {
        let row = sqlx::query("SELECT value FROM realstack_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match row {
            Some(r) => Some(r.try_get::<JsonValue, _>("value")?),
            None => None,
        })
    }

    async fn save_setting(&self, key: &str, value: JsonValue) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO realstack_settings (key, value, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn decode_asset(row: &sqlx::postgres::PgRow) -> anyhow::Result<Asset> {
    let document: JsonValue = row.try_get("document")?;
    serde_json::from_value(document).context("corrupt asset document")
}

fn decode_proposal(row: &sqlx::postgres::PgRow) -> anyhow::Result<Proposal> {
    let document: JsonValue = row.try_get("document")?;
    serde_json::from_value(document).context("corrupt proposal document")
}

fn push_asset_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AssetFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(owner) = &filter.owner {
        qb.push(" AND owner = ").push_bind(owner.clone());
    }
}

/// Escapes `%`, `_` and `\` for use inside an ILIKE pattern.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl AssetStore for PgStore {
    async fn insert_asset(&self, asset: &Asset) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO assets (id, name, category, status, owner, document, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(asset.id)
        .bind(&asset.name)
        .bind(asset.category.as_str())
        .bind(asset.status.as_str())
        .bind(&asset.owner)
        .bind(serde_json::to_value(asset)?)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_asset(&self, asset: &Asset) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE assets
             SET name = $2, category = $3, status = $4, owner = $5, document = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(asset.id)
        .bind(&asset.name)
        .bind(asset.category.as_str())
        .bind(asset.status.as_str())
        .bind(&asset.owner)
        .bind(serde_json::to_value(asset)?)
        .bind(asset.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_asset(&self, id: Uuid) -> anyhow::Result<Option<Asset>> {
        let row = sqlx::query("SELECT document FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_asset).transpose()
    }

    async fn delete_asset(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_assets(&self, filter: &AssetFilter) -> anyhow::Result<AssetPage> {
        let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) AS total FROM assets");
        push_asset_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT document FROM assets");
        push_asset_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(filter.per_page as i64)
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let items = rows.iter().map(decode_asset).collect::<anyhow::Result<Vec<_>>>()?;
        Ok(AssetPage {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn search_assets(&self, query: &str, limit: u32) -> anyhow::Result<Vec<Asset>> {
        let rows = sqlx::query(
            "SELECT document FROM assets
             WHERE name ILIKE $1
                OR document->>'description' ILIKE $1
                OR document->>'location' ILIKE $1
             ORDER BY created_at DESC, id ASC
             LIMIT $2",
        )
        .bind(like_pattern(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_asset).collect()
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ProposalStore for PgStore {
    async fn insert_proposal(&self, proposal: &Proposal) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO governance_proposals (id, is_active, document, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(proposal.id)
        .bind(proposal.is_active)
        .bind(serde_json::to_value(proposal)?)
        .bind(proposal.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_proposal(&self, proposal: &Proposal) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE governance_proposals SET is_active = $2, document = $3 WHERE id = $1",
        )
        .bind(proposal.id)
        .bind(proposal.is_active)
        .bind(serde_json::to_value(proposal)?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_proposal(&self, id: Uuid) -> anyhow::Result<Option<Proposal>> {
        let row = sqlx::query("SELECT document FROM governance_proposals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_proposal).transpose()
    }

    async fn list_proposals(&self, active_only: bool) -> anyhow::Result<Vec<Proposal>> {
        let rows = sqlx::query(
            "SELECT document FROM governance_proposals
             WHERE ($1 = FALSE OR is_active)
             ORDER BY created_at DESC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_proposal).collect()
    }

    async fn load_governance_config(&self) -> anyhow::Result<Option<GovernanceConfig>> {
        self.load_setting(GOVERNANCE_CONFIG_KEY)
            .await?
            .map(|v| serde_json::from_value(v).context("corrupt governance config"))
            .transpose()
    }

    async fn save_governance_config(&self, config: &GovernanceConfig) -> anyhow::Result<()> {
        self.save_setting(GOVERNANCE_CONFIG_KEY, serde_json::to_value(config)?)
            .await
    }
}

#[async_trait]
impl PlatformTokenStore for PgStore {
    async fn load_platform_token(&self) -> anyhow::Result<Option<PlatformToken>> {
        self.load_setting(PLATFORM_TOKEN_KEY)
            .await?
            .map(|v| serde_json::from_value(v).context("corrupt platform token"))
            .transpose()
    }

    async fn save_platform_token(&self, token: &PlatformToken) -> anyhow::Result<()> {
        self.save_setting(PLATFORM_TOKEN_KEY, serde_json::to_value(token)?)
            .await
    }
}
