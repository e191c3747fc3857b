//! Application services: domain rules bound to the stores, the ledger and the clock.

pub mod asset_service;
pub mod clock;
pub mod governance_service;
pub mod tokenomics_service;

pub use asset_service::{AssetHistory, AssetService, AssetUpdate, NewDocument};
pub use clock::{Clock, ManualClock, SystemClock};
pub use governance_service::{GovernanceService, NewProposal};
pub use tokenomics_service::{FeeQuote, TokenomicsService};

use thiserror::Error;

use crate::domain::DomainError;
use crate::infra::solana::LedgerError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
