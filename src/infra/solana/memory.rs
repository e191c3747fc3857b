//! Deterministic in-process ledger (`LEDGER_MODE=memory`).
//!
//! Mirrors the state the on-chain program keeps per asset token and lets tests force
//! individual operations to fail.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::infra::solana::{observe, AssetTokenRequest, LedgerError, LedgerReceipt, TokenLedger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub request: AssetTokenRequest,
    pub valuation: u64,
    pub current_share_price: u64,
    pub is_verified: bool,
    pub is_tradable: bool,
    pub is_burned: bool,
    pub total_income_distributed: u64,
}

#[derive(Default)]
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<String, LedgerAccount>>,
    failing: Mutex<HashSet<&'static str>>,
    sequence: AtomicU64,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` fail with an RPC error.
    pub fn fail_on(&self, operation: &'static str) {
        guard(&self.failing).insert(operation);
    }

    pub fn clear_failures(&self) {
        guard(&self.failing).clear();
    }

    pub fn account(&self, token_account: &str) -> Option<LedgerAccount> {
        guard(&self.accounts).get(token_account).cloned()
    }

    pub fn account_count(&self) -> usize {
        guard(&self.accounts).len()
    }

    fn check(&self, operation: &'static str) -> Result<(), LedgerError> {
        if guard(&self.failing).contains(operation) {
            return Err(LedgerError::Rpc {
                operation,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn next_signature(&self) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("memsig{:058}", n)
    }

    fn with_account<F>(&self, operation: &'static str, token_account: &str, f: F) -> Result<String, LedgerError>
    where
        F: FnOnce(&mut LedgerAccount) -> Result<(), LedgerError>,
    {
        self.check(operation)?;
        let mut accounts = guard(&self.accounts);
        let account = accounts
            .get_mut(token_account)
            .ok_or_else(|| LedgerError::UnknownAccount(token_account.to_string()))?;
        f(account)?;
        Ok(self.next_signature())
    }
}

#[async_trait]
impl TokenLedger for InMemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_asset_token(&self, request: &AssetTokenRequest) -> Result<LedgerReceipt, LedgerError> {
        observe("create_asset_token", async {
            self.check("create_asset_token")?;
            let token_account = format!("memacct{}", request.asset_id.simple());
            guard(&self.accounts).insert(
                token_account.clone(),
                LedgerAccount {
                    request: request.clone(),
                    valuation: request.valuation,
                    current_share_price: request.share_price,
                    is_verified: false,
                    is_tradable: false,
                    is_burned: false,
                    total_income_distributed: 0,
                },
            );
            Ok(LedgerReceipt {
                token_account,
                signature: self.next_signature(),
            })
        })
        .await
    }

    async fn verify_asset(&self, token_account: &str) -> Result<String, LedgerError> {
        observe("verify_asset", async {
            self.with_account("verify_asset", token_account, |a| {
                a.is_verified = true;
                Ok(())
            })
        })
        .await
    }

    async fn update_asset_valuation(
        &self,
        token_account: &str,
        valuation: u64,
        share_price: u64,
    ) -> Result<String, LedgerError> {
        observe("update_asset_valuation", async {
            self.with_account("update_asset_valuation", token_account, |a| {
                a.valuation = valuation;
                a.current_share_price = share_price;
                Ok(())
            })
        })
        .await
    }

    async fn toggle_tradability(&self, token_account: &str, is_tradable: bool) -> Result<String, LedgerError> {
        observe("toggle_tradability", async {
            self.with_account("toggle_tradability", token_account, |a| {
                a.is_tradable = is_tradable;
                Ok(())
            })
        })
        .await
    }

    async fn burn_asset_token(&self, token_account: &str) -> Result<String, LedgerError> {
        observe("burn_asset_token", async {
            self.with_account("burn_asset_token", token_account, |a| {
                if a.is_burned {
                    return Err(LedgerError::AlreadyBurned(token_account.to_string()));
                }
                a.is_burned = true;
                a.is_tradable = false;
                Ok(())
            })
        })
        .await
    }

    async fn distribute_income(&self, token_account: &str, amount: u64) -> Result<String, LedgerError> {
        observe("distribute_income", async {
            self.with_account("distribute_income", token_account, |a| {
                if a.is_burned {
                    return Err(LedgerError::AlreadyBurned(token_account.to_string()));
                }
                a.total_income_distributed = a
                    .total_income_distributed
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::IncomeOverflow(token_account.to_string()))?;
                Ok(())
            })
        })
        .await
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        self.check("ping")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssetCategory;
    use uuid::Uuid;

    fn request() -> AssetTokenRequest {
        AssetTokenRequest {
            asset_id: Uuid::new_v4(),
            name: "Loft".into(),
            symbol: "LOFT".into(),
            category: AssetCategory::RealEstate,
            description: "d".into(),
            uri: "realstack://assets/x".into(),
            valuation: 1_000,
            total_shares: 10,
            share_price: 100,
        }
    }

    #[tokio::test]
    async fn tracks_account_state() {
        let ledger = InMemoryLedger::new();
        let receipt = ledger.create_asset_token(&request()).await.unwrap();
        ledger.verify_asset(&receipt.token_account).await.unwrap();
        ledger.toggle_tradability(&receipt.token_account, true).await.unwrap();
        ledger
            .update_asset_valuation(&receipt.token_account, 2_000, 200)
            .await
            .unwrap();

        let acct = ledger.account(&receipt.token_account).unwrap();
        assert!(acct.is_verified && acct.is_tradable);
        assert_eq!(acct.current_share_price, 200);

        ledger.distribute_income(&receipt.token_account, 50).await.unwrap();
        ledger.distribute_income(&receipt.token_account, 25).await.unwrap();
        assert_eq!(
            ledger.account(&receipt.token_account).unwrap().total_income_distributed,
            75
        );

        ledger.burn_asset_token(&receipt.token_account).await.unwrap();
        assert!(matches!(
            ledger.distribute_income(&receipt.token_account, 1).await,
            Err(LedgerError::AlreadyBurned(_))
        ));
        assert!(matches!(
            ledger.burn_asset_token(&receipt.token_account).await,
            Err(LedgerError::AlreadyBurned(_))
        ));
    }

    #[tokio::test]
    async fn injected_failures() {
        let ledger = InMemoryLedger::new();
        ledger.fail_on("create_asset_token");
        assert!(matches!(
            ledger.create_asset_token(&request()).await,
            Err(LedgerError::Rpc { operation: "create_asset_token", .. })
        ));
        assert_eq!(ledger.account_count(), 0);
        ledger.clear_failures();
        assert!(ledger.create_asset_token(&request()).await.is_ok());
        assert!(matches!(
            ledger.verify_asset("nope").await,
            Err(LedgerError::UnknownAccount(_))
        ));
    }
}
