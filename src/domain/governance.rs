//! Off-chain governance: proposals, one vote per voter, quorum and approval threshold.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_PROPOSAL_DESCRIPTION_LEN: usize = 1_000;
/// Upper bound for either voting period: ten years.
pub const MAX_VOTING_PERIOD_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct GovernanceConfig {
    /// Seconds.
    pub min_voting_period: i64,
    /// Seconds.
    pub max_voting_period: i64,
    pub min_quorum_votes: u64,
    /// Percentage of yes votes (0..=100) needed to pass.
    pub approval_threshold: u8,
    pub min_vote_weight: u64,
    pub governance_active: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            min_voting_period: 24 * 60 * 60,
            max_voting_period: 14 * 24 * 60 * 60,
            min_quorum_votes: 1_000,
            approval_threshold: 60,
            min_vote_weight: 1,
            governance_active: true,
        }
    }
}

impl GovernanceConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if self.min_voting_period <= 0
            || self.max_voting_period < self.min_voting_period
            || self.max_voting_period > MAX_VOTING_PERIOD_SECS
        {
            return Err(DomainError::InvalidVotingPeriod);
        }
        if self.approval_threshold == 0 || self.approval_threshold > 100 {
            return Err(DomainError::InvalidParameters(
                "approval_threshold must be 1..=100".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    #[default]
    Text,
    PlatformParameters,
    AddAssetCategory,
    UpdateFees,
    ProgramUpgrade,
    TreasuryTransfer,
    AssetAction,
    CommunityFunding,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcome {
    Passed,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct VoteRecord {
    pub voter: String,
    pub is_yes_vote: bool,
    pub vote_weight: u64,
    pub cast_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Proposal {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub proposer: String,
    pub proposal_type: ProposalType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub voting_ends_at: DateTime<Utc>,
    pub yes_votes: u64,
    pub no_votes: u64,
    pub quorum_votes: u64,
    pub approval_threshold_percentage: u8,
    pub votes: Vec<VoteRecord>,
    pub executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProposalOutcome>,
}

impl Proposal {
    pub fn create(
        config: &GovernanceConfig,
        proposer: &str,
        title: &str,
        description: &str,
        proposal_type: ProposalType,
        voting_ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !config.governance_active {
            return Err(DomainError::GovernanceInactive);
        }
        let title_len = title.trim().chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(DomainError::InvalidParameters(format!(
                "title must be 1..={} characters",
                MAX_TITLE_LEN
            )));
        }
        let desc_len = description.trim().chars().count();
        if desc_len == 0 || desc_len > MAX_PROPOSAL_DESCRIPTION_LEN {
            return Err(DomainError::InvalidParameters(format!(
                "description must be 1..={} characters",
                MAX_PROPOSAL_DESCRIPTION_LEN
            )));
        }

        // Stored configs predating the period cap are not trusted to fit a Duration.
        let window_end = |secs: i64| {
            Duration::try_seconds(secs)
                .and_then(|period| now.checked_add_signed(period))
                .ok_or(DomainError::InvalidVotingPeriod)
        };
        let min_end = window_end(config.min_voting_period)?;
        let max_end = window_end(config.max_voting_period)?;
        if voting_ends_at < min_end || voting_ends_at > max_end {
            return Err(DomainError::InvalidVotingPeriod);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            proposer: proposer.to_string(),
            proposal_type,
            is_active: true,
            created_at: now,
            voting_ends_at,
            yes_votes: 0,
            no_votes: 0,
            quorum_votes: config.min_quorum_votes,
            approval_threshold_percentage: config.approval_threshold,
            votes: Vec::new(),
            executed: false,
            executed_at: None,
            executor: None,
            outcome: None,
        })
    }

    pub fn cast_vote(
        &mut self,
        config: &GovernanceConfig,
        voter: &str,
        vote_yes: bool,
        vote_weight: u64,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.is_active {
            return Err(DomainError::ProposalInactive);
        }
        if now >= self.voting_ends_at {
            return Err(DomainError::VotingPeriodEnded);
        }
        if vote_weight < config.min_vote_weight {
            return Err(DomainError::InvalidParameters(format!(
                "vote weight must be at least {}",
                config.min_vote_weight
            )));
        }
        if self.votes.iter().any(|v| v.voter == voter) {
            return Err(DomainError::AlreadyVoted(voter.to_string()));
        }

        if vote_yes {
            self.yes_votes = self
                .yes_votes
                .checked_add(vote_weight)
                .ok_or(DomainError::MathOverflow)?;
        } else {
            self.no_votes = self
                .no_votes
                .checked_add(vote_weight)
                .ok_or(DomainError::MathOverflow)?;
        }
        self.votes.push(VoteRecord {
            voter: voter.to_string(),
            is_yes_vote: vote_yes,
            vote_weight,
            cast_at: now,
        });
        Ok(())
    }

    /// Percentage (0..=100) of yes votes, rounded down.
    pub fn yes_percentage(&self) -> DomainResult<u128> {
        let total = self
            .yes_votes
            .checked_add(self.no_votes)
            .ok_or(DomainError::MathOverflow)?;
        if total == 0 {
            return Ok(0);
        }
        Ok(self.yes_votes as u128 * 100 / total as u128)
    }

    pub fn execute(&mut self, executor: &str, now: DateTime<Utc>) -> DomainResult<ProposalOutcome> {
        if self.executed {
            return Err(DomainError::ProposalAlreadyExecuted);
        }
        if !self.is_active {
            return Err(DomainError::ProposalInactive);
        }
        if now < self.voting_ends_at {
            return Err(DomainError::VotingPeriodNotEnded);
        }
        let total = self
            .yes_votes
            .checked_add(self.no_votes)
            .ok_or(DomainError::MathOverflow)?;
        if total < self.quorum_votes {
            return Err(DomainError::QuorumNotReached {
                votes: total,
                required: self.quorum_votes,
            });
        }

        let outcome = if self.yes_percentage()? >= self.approval_threshold_percentage as u128 {
            ProposalOutcome::Passed
        } else {
            ProposalOutcome::Failed
        };
        self.executed = true;
        self.is_active = false;
        self.executed_at = Some(now);
        self.executor = Some(executor.to_string());
        self.outcome = Some(outcome);
        Ok(outcome)
    }
}
