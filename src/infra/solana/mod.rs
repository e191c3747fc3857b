//! On-chain side of tokenization.
//!
//! [`TokenLedger`] is the seam services use; [`SolanaLedger`] talks to the deployed program,
//! [`InMemoryLedger`] stands in for it locally and in tests.

pub mod client;
pub mod instructions;
pub mod memory;

pub use client::SolanaLedger;
pub use memory::InMemoryLedger;

use async_trait::async_trait;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::AssetCategory;
use crate::infra::metrics::{SOLANA_RPC_DURATION, SOLANA_RPC_FAILURES};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid ledger configuration: {0}")]
    Config(String),

    #[error("Solana RPC error during {operation}: {message}")]
    Rpc {
        operation: &'static str,
        message: String,
    },

    #[error("Unknown token account {0}")]
    UnknownAccount(String),

    #[error("Asset token {0} is already burned")]
    AlreadyBurned(String),

    #[error("Income total of {0} would overflow")]
    IncomeOverflow(String),
}

/// Arguments of the `create_asset_token` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTokenRequest {
    pub asset_id: Uuid,
    pub name: String,
    pub symbol: String,
    pub category: AssetCategory,
    pub description: String,
    pub uri: String,
    pub valuation: u64,
    pub total_shares: u64,
    pub share_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    /// Base58 address of the created asset token account.
    pub token_account: String,
    pub signature: String,
}

/// Every call returns the confirmed transaction signature.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_asset_token(&self, request: &AssetTokenRequest) -> Result<LedgerReceipt, LedgerError>;

    async fn verify_asset(&self, token_account: &str) -> Result<String, LedgerError>;

    async fn update_asset_valuation(
        &self,
        token_account: &str,
        valuation: u64,
        share_price: u64,
    ) -> Result<String, LedgerError>;

    async fn toggle_tradability(&self, token_account: &str, is_tradable: bool) -> Result<String, LedgerError>;

    async fn burn_asset_token(&self, token_account: &str) -> Result<String, LedgerError>;

    /// Adds `amount` to the income total kept on the asset token account.
    async fn distribute_income(&self, token_account: &str, amount: u64) -> Result<String, LedgerError>;

    /// Liveness probe for `/health`.
    async fn ping(&self) -> Result<(), LedgerError>;
}

/// Records latency and failures of one ledger operation.
pub(crate) async fn observe<T, F>(operation: &'static str, fut: F) -> Result<T, LedgerError>
where
    F: std::future::Future<Output = Result<T, LedgerError>>,
{
    let start = Instant::now();
    let result = fut.await;
    metrics::histogram!(SOLANA_RPC_DURATION, "operation" => operation)
        .record(start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        metrics::counter!(SOLANA_RPC_FAILURES, "operation" => operation).increment(1);
        tracing::warn!(operation, error = %e, "ledger operation failed");
    }
    result
}
