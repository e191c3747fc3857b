//! Domain-level errors shared by the asset, tokenomics and governance rules.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::asset::AssetStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: AssetStatus, to: AssetStatus },

    #[error("Asset {0} not found")]
    AssetNotFound(Uuid),

    #[error("Proposal {0} not found")]
    ProposalNotFound(Uuid),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Asset is not verified")]
    AssetNotVerified,

    #[error("Asset is already tokenized")]
    AssetAlreadyTokenized,

    #[error("Asset is not tokenized")]
    AssetNotTokenized,

    #[error("Asset token has been burned")]
    AssetBurned,

    #[error("Math overflow occurred")]
    MathOverflow,

    #[error("Platform token is not initialized")]
    TokenNotInitialized,

    #[error("Platform token is already initialized")]
    TokenAlreadyInitialized,

    #[error("Token transfers are paused")]
    TransfersPaused,

    #[error("Governance is not active")]
    GovernanceInactive,

    #[error("Invalid voting period")]
    InvalidVotingPeriod,

    #[error("Proposal is inactive")]
    ProposalInactive,

    #[error("Voting period has ended")]
    VotingPeriodEnded,

    #[error("Voting period has not ended")]
    VotingPeriodNotEnded,

    #[error("Proposal has already been executed")]
    ProposalAlreadyExecuted,

    #[error("Voter {0} has already voted on this proposal")]
    AlreadyVoted(String),

    #[error("Quorum not reached: {votes} of {required} votes")]
    QuorumNotReached { votes: u64, required: u64 },
}

pub type DomainResult<T> = Result<T, DomainError>;
