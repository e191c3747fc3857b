use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use utoipa::ToSchema;

use crate::app::{Clock, ServiceResult};
use crate::domain::{DomainError, FeeConfig, PlatformToken, Principal};
use crate::storage::PlatformTokenStore;

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct FeeQuote {
    pub amount: u64,
    pub fee: u64,
    pub net_amount: u64,
    pub transaction_fee_bps: u16,
}

pub struct TokenomicsService {
    store: Arc<dyn PlatformTokenStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl TokenomicsService {
    pub fn new(store: Arc<dyn PlatformTokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn get(&self) -> ServiceResult<PlatformToken> {
        Ok(self
            .store
            .load_platform_token()
            .await?
            .ok_or(DomainError::TokenNotInitialized)?)
    }

    /// The caller becomes the token authority.
    pub async fn initialize(
        &self,
        principal: &Principal,
        name: &str,
        symbol: &str,
        uri: &str,
        total_supply: u64,
    ) -> ServiceResult<PlatformToken> {
        let _guard = self.write_lock.lock().await;
        if self.store.load_platform_token().await?.is_some() {
            return Err(DomainError::TokenAlreadyInitialized.into());
        }
        let token = PlatformToken::initialize(
            name,
            symbol,
            uri,
            total_supply,
            &principal.subject,
            self.clock.now(),
        )?;
        self.store.save_platform_token(&token).await?;
        info!(symbol = %token.symbol, total_supply, authority = %token.authority, "platform token initialized");
        Ok(token)
    }

    async fn modify<F>(&self, f: F) -> ServiceResult<PlatformToken>
    where
        F: FnOnce(&mut PlatformToken) -> Result<(), DomainError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut token = self.get().await?;
        f(&mut token)?;
        self.store.save_platform_token(&token).await?;
        Ok(token)
    }

    pub async fn update_fees(&self, principal: &Principal, config: FeeConfig) -> ServiceResult<PlatformToken> {
        let now = self.clock.now();
        let token = self
            .modify(|t| t.update_fee_config(&principal.subject, config, now))
            .await?;
        info!(fee_bps = token.fee_config.transaction_fee_bps, fees_enabled = token.fee_config.fees_enabled, "fee config updated");
        Ok(token)
    }

    pub async fn set_transfer_pause(&self, principal: &Principal, paused: bool) -> ServiceResult<PlatformToken> {
        let now = self.clock.now();
        let token = self
            .modify(|t| t.set_transfer_pause(&principal.subject, paused, now))
            .await?;
        info!(paused, "transfer pause changed");
        Ok(token)
    }

    pub async fn transfer_authority(
        &self,
        principal: &Principal,
        new_authority: &str,
    ) -> ServiceResult<PlatformToken> {
        let now = self.clock.now();
        let token = self
            .modify(|t| t.transfer_authority(&principal.subject, new_authority, now))
            .await?;
        info!(pending_authority = %new_authority, "authority transfer proposed");
        Ok(token)
    }

    pub async fn accept_authority(&self, principal: &Principal) -> ServiceResult<PlatformToken> {
        let now = self.clock.now();
        let token = self
            .modify(|t| t.accept_authority(&principal.subject, now))
            .await?;
        info!(authority = %token.authority, "authority transfer accepted");
        Ok(token)
    }

    pub async fn fee_quote(&self, amount: u64) -> ServiceResult<FeeQuote> {
        let token = self.get().await?;
        let fee = token.calculate_fee(amount)?;
        Ok(FeeQuote {
            amount,
            fee,
            net_amount: amount - fee,
            transaction_fee_bps: token.fee_config.transaction_fee_bps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SystemClock;
    use crate::app::ServiceError;
    use crate::domain::Role;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn initialize_once_and_quote_fees() {
        let service = TokenomicsService::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        let admin = Principal::new("root", Role::Admin);

        assert!(matches!(
            service.fee_quote(100).await,
            Err(ServiceError::Domain(DomainError::TokenNotInitialized))
        ));

        service
            .initialize(&admin, "RealStack", "REAL", "https://realstack.io/real.json", 1_000_000_000)
            .await
            .unwrap();
        assert!(matches!(
            service.initialize(&admin, "Again", "AGN", "", 1).await,
            Err(ServiceError::Domain(DomainError::TokenAlreadyInitialized))
        ));

        let quote = service.fee_quote(40_000).await.unwrap();
        assert_eq!(quote.fee, 100);
        assert_eq!(quote.net_amount, 39_900);
    }

    #[tokio::test]
    async fn only_authority_can_pause() {
        let service = TokenomicsService::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        let admin = Principal::new("root", Role::Admin);
        service
            .initialize(&admin, "RealStack", "REAL", "", 1_000)
            .await
            .unwrap();
        let other = Principal::new("root-2", Role::Admin);
        assert!(service.set_transfer_pause(&other, true).await.is_err());
        assert!(service.set_transfer_pause(&admin, true).await.unwrap().transfers_paused);
        assert!(matches!(
            service.fee_quote(1).await,
            Err(ServiceError::Domain(DomainError::TransfersPaused))
        ));
    }
}
