//! Typed records and the pure rules that govern them.

pub mod asset;
pub mod error;
pub mod governance;
pub mod roles;
pub mod tokenomics;

pub use asset::{
    Asset, AssetCategory, AssetDocument, AssetStatus, IncomeDistributionFrequency, NewAsset,
    StatusChange, Tokenization, TokenizationParams, Valuation, Verification, VerificationAction,
    VerificationStatus,
};
pub use error::{DomainError, DomainResult};
pub use governance::{GovernanceConfig, Proposal, ProposalOutcome, ProposalType, VoteRecord};
pub use roles::{Principal, Role};
pub use tokenomics::{FeeConfig, PlatformToken, TokenDistribution};
