//! REAL platform token: supply distribution, fee configuration, authority handover.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::error::{DomainError, DomainResult};

/// Default transaction fee, 0.25%.
pub const DEFAULT_FEE_BPS: u16 = 25;
/// Fees above 10% are rejected.
pub const MAX_FEE_BPS: u16 = 1_000;
const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct FeeConfig {
    pub transaction_fee_bps: u16,
    pub fee_recipient: String,
    pub fees_enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
pub struct TokenDistribution {
    pub community_allocation: u64,
    pub asset_reserve_allocation: u64,
    pub development_allocation: u64,
    pub liquidity_allocation: u64,
    pub team_allocation: u64,
}

impl TokenDistribution {
    /// 40% community, 25% asset reserve, 20% development, 10% liquidity, 5% team.
    pub fn for_supply(total_supply: u64) -> Self {
        Self {
            community_allocation: percentage_of(total_supply, 40),
            asset_reserve_allocation: percentage_of(total_supply, 25),
            development_allocation: percentage_of(total_supply, 20),
            liquidity_allocation: percentage_of(total_supply, 10),
            team_allocation: percentage_of(total_supply, 5),
        }
    }

    pub fn allocated(&self) -> u128 {
        self.community_allocation as u128
            + self.asset_reserve_allocation as u128
            + self.development_allocation as u128
            + self.liquidity_allocation as u128
            + self.team_allocation as u128
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct PlatformToken {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub total_supply: u64,
    pub authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_authority: Option<String>,
    pub transfers_paused: bool,
    pub fee_config: FeeConfig,
    pub distribution: TokenDistribution,
    pub initialized_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl PlatformToken {
    pub fn initialize(
        name: &str,
        symbol: &str,
        uri: &str,
        total_supply: u64,
        authority: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if name.trim().is_empty() || symbol.trim().is_empty() {
            return Err(DomainError::InvalidParameters(
                "name and symbol are required".to_string(),
            ));
        }
        if total_supply == 0 {
            return Err(DomainError::InvalidParameters(
                "total_supply must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            name: name.trim().to_string(),
            symbol: symbol.trim().to_string(),
            uri: uri.to_string(),
            total_supply,
            authority: authority.to_string(),
            pending_authority: None,
            transfers_paused: false,
            fee_config: FeeConfig {
                transaction_fee_bps: DEFAULT_FEE_BPS,
                fee_recipient: authority.to_string(),
                fees_enabled: true,
            },
            distribution: TokenDistribution::for_supply(total_supply),
            initialized_at: now,
            last_update: now,
        })
    }

    fn ensure_authority(&self, caller: &str) -> DomainResult<()> {
        if self.authority != caller {
            return Err(DomainError::Unauthorized(
                "caller is not the token authority".to_string(),
            ));
        }
        Ok(())
    }

    /// First step of the handover: only the current authority may nominate.
    pub fn transfer_authority(
        &mut self,
        caller: &str,
        new_authority: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_authority(caller)?;
        if new_authority.trim().is_empty() {
            return Err(DomainError::InvalidParameters(
                "new authority is required".to_string(),
            ));
        }
        self.pending_authority = Some(new_authority.to_string());
        self.last_update = now;
        Ok(())
    }

    /// Second step: only the nominated account may accept.
    pub fn accept_authority(&mut self, caller: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if self.pending_authority.as_deref() != Some(caller) {
            return Err(DomainError::Unauthorized(
                "caller is not the pending authority".to_string(),
            ));
        }
        self.authority = caller.to_string();
        self.pending_authority = None;
        self.last_update = now;
        Ok(())
    }

    pub fn update_fee_config(
        &mut self,
        caller: &str,
        config: FeeConfig,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_authority(caller)?;
        if config.transaction_fee_bps > MAX_FEE_BPS {
            return Err(DomainError::InvalidParameters(format!(
                "transaction_fee_bps must be <= {}",
                MAX_FEE_BPS
            )));
        }
        self.fee_config = config;
        self.last_update = now;
        Ok(())
    }

    pub fn set_transfer_pause(
        &mut self,
        caller: &str,
        paused: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.ensure_authority(caller)?;
        self.transfers_paused = paused;
        self.last_update = now;
        Ok(())
    }

    /// Fee charged on a transfer of `amount`. Fails while transfers are paused.
    pub fn calculate_fee(&self, amount: u64) -> DomainResult<u64> {
        if self.transfers_paused {
            return Err(DomainError::TransfersPaused);
        }
        if !self.fee_config.fees_enabled {
            return Ok(0);
        }
        let fee = amount as u128 * self.fee_config.transaction_fee_bps as u128 / BPS_DENOMINATOR;
        u64::try_from(fee).map_err(|_| DomainError::MathOverflow)
    }
}

fn percentage_of(value: u64, percentage: u8) -> u64 {
    (value as u128 * percentage as u128 / 100) as u64
}
