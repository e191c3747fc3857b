//! The `Asset` record and its lifecycle rules.
//!
//! Status moves along `pending -> verifying -> verified -> tokenizing -> tokenized`.
//! Side branches: rejection (from `pending`/`verifying`), resubmission (`rejected -> pending`),
//! chain rollback (`tokenizing -> verified`) and delisting (from `verified`/`tokenized`).
//! Every accepted transition is appended to `status_history`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::error::{DomainError, DomainResult};

/// Byte limits; the on-chain asset account reserves exactly this much space.
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_TOTAL_SHARES: u64 = 1_000_000_000;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    RealEstate,
    Art,
    Collectible,
    Commodity,
    Vehicle,
    Other,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 6] = [
        AssetCategory::RealEstate,
        AssetCategory::Art,
        AssetCategory::Collectible,
        AssetCategory::Commodity,
        AssetCategory::Vehicle,
        AssetCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::RealEstate => "real_estate",
            AssetCategory::Art => "art",
            AssetCategory::Collectible => "collectible",
            AssetCategory::Commodity => "commodity",
            AssetCategory::Vehicle => "vehicle",
            AssetCategory::Other => "other",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        AssetCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| DomainError::InvalidParameters(format!("unknown category '{}'", s)))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Verifying,
    Verified,
    Tokenizing,
    Tokenized,
    Rejected,
    Delisted,
}

impl AssetStatus {
    pub const ALL: [AssetStatus; 7] = [
        AssetStatus::Pending,
        AssetStatus::Verifying,
        AssetStatus::Verified,
        AssetStatus::Tokenizing,
        AssetStatus::Tokenized,
        AssetStatus::Rejected,
        AssetStatus::Delisted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Verifying => "verifying",
            AssetStatus::Verified => "verified",
            AssetStatus::Tokenizing => "tokenizing",
            AssetStatus::Tokenized => "tokenized",
            AssetStatus::Rejected => "rejected",
            AssetStatus::Delisted => "delisted",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: AssetStatus) -> bool {
        use AssetStatus::*;
        matches!(
            (self, next),
            (Pending, Verifying)
                | (Verifying, Verified)
                | (Verified, Tokenizing)
                | (Tokenizing, Tokenized)
                | (Pending, Rejected)
                | (Verifying, Rejected)
                | (Rejected, Pending)
                | (Tokenizing, Verified)
                | (Verified, Delisted)
                | (Tokenized, Delisted)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == AssetStatus::Delisted
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        AssetStatus::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == wanted)
            .ok_or_else(|| DomainError::InvalidParameters(format!("unknown status '{}'", s)))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Unverified,
    InReview,
    Approved,
    Rejected,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationAction {
    StartReview,
    Approve,
    Reject,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IncomeDistributionFrequency {
    #[default]
    Monthly,
    Quarterly,
    SemiAnnually,
    Annually,
    Custom,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Valuation {
    /// USD cents.
    pub amount: u64,
    pub source: String,
    pub appraiser: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct StatusChange {
    pub from: Option<AssetStatus>,
    pub to: AssetStatus,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct AssetDocument {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Verification {
    pub verifier: String,
    pub action: VerificationAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Tokenization {
    pub symbol: String,
    /// Base58 address of the on-chain asset token account.
    pub token_account: String,
    pub signature: String,
    pub total_shares: u64,
    pub initial_share_price: u64,
    pub current_share_price: u64,
    pub is_tradable: bool,
    pub is_burned: bool,
    pub income_distribution_frequency: IncomeDistributionFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_income_distribution: Option<DateTime<Utc>>,
    pub total_income_distributed: u64,
    pub tokenized_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: AssetCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub owner: String,
    pub status: AssetStatus,
    pub verification_status: VerificationStatus,
    /// Current valuation in USD cents.
    pub valuation: u64,
    pub valuation_history: Vec<Valuation>,
    pub status_history: Vec<StatusChange>,
    pub documents: Vec<AssetDocument>,
    pub verifications: Vec<Verification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenization: Option<Tokenization>,
    #[schema(value_type = Object)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to list a new asset.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub name: String,
    pub description: String,
    pub category: AssetCategory,
    pub location: Option<String>,
    pub valuation: u64,
    pub metadata: JsonValue,
}

impl Asset {
    /// Builds a freshly listed asset: `pending`, unverified, one valuation entry.
    pub fn new(input: NewAsset, owner: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        validate_name(&input.name)?;
        validate_description(&input.description)?;
        if input.valuation == 0 {
            return Err(DomainError::InvalidParameters(
                "valuation must be greater than zero".to_string(),
            ));
        }
        let metadata = match input.metadata {
            JsonValue::Null => JsonValue::Object(Default::default()),
            JsonValue::Object(m) => JsonValue::Object(m),
            _ => {
                return Err(DomainError::InvalidParameters(
                    "metadata must be a JSON object".to_string(),
                ))
            }
        };

        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            location: input.location,
            owner: owner.to_string(),
            status: AssetStatus::Pending,
            verification_status: VerificationStatus::Unverified,
            valuation: input.valuation,
            valuation_history: vec![Valuation {
                amount: input.valuation,
                source: "listing".to_string(),
                appraiser: owner.to_string(),
                notes: None,
                recorded_at: now,
            }],
            status_history: vec![StatusChange {
                from: None,
                to: AssetStatus::Pending,
                actor: owner.to_string(),
                reason: None,
                changed_at: now,
            }],
            documents: Vec::new(),
            verifications: Vec::new(),
            tokenization: None,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a lifecycle transition, recording it in `status_history`.
    pub fn transition(
        &mut self,
        next: AssetStatus,
        actor: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status_history.push(StatusChange {
            from: Some(self.status),
            to: next,
            actor: actor.to_string(),
            reason,
            changed_at: now,
        });
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Applies a verifier decision. Returns the resulting status.
    pub fn apply_verification(
        &mut self,
        action: VerificationAction,
        verifier: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<AssetStatus> {
        let (next, verification_status) = match action {
            VerificationAction::StartReview => (AssetStatus::Verifying, VerificationStatus::InReview),
            VerificationAction::Approve => (AssetStatus::Verified, VerificationStatus::Approved),
            VerificationAction::Reject => (AssetStatus::Rejected, VerificationStatus::Rejected),
        };
        self.transition(next, verifier, notes.clone(), now)?;
        self.verification_status = verification_status;
        self.verifications.push(Verification {
            verifier: verifier.to_string(),
            action,
            notes,
            recorded_at: now,
        });
        Ok(next)
    }

    /// Records a new appraisal. For a tokenized asset the share price follows the valuation.
    pub fn record_valuation(
        &mut self,
        amount: u64,
        source: &str,
        appraiser: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if amount == 0 {
            return Err(DomainError::InvalidParameters(
                "valuation must be greater than zero".to_string(),
            ));
        }
        if self.status.is_terminal() {
            return Err(DomainError::InvalidParameters(
                "cannot revalue a delisted asset".to_string(),
            ));
        }
        if let Some(token) = self.tokenization.as_mut() {
            if token.is_burned {
                return Err(DomainError::AssetBurned);
            }
            let share_price = amount / token.total_shares;
            if share_price == 0 {
                return Err(DomainError::InvalidParameters(
                    "valuation too low for the number of shares".to_string(),
                ));
            }
            token.current_share_price = share_price;
        }
        self.valuation = amount;
        self.valuation_history.push(Valuation {
            amount,
            source: source.to_string(),
            appraiser: appraiser.to_string(),
            notes,
            recorded_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn tokenization_mut(&mut self) -> DomainResult<&mut Tokenization> {
        let token = self
            .tokenization
            .as_mut()
            .ok_or(DomainError::AssetNotTokenized)?;
        if token.is_burned {
            return Err(DomainError::AssetBurned);
        }
        Ok(token)
    }

    pub fn set_tradability(&mut self, is_tradable: bool, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != AssetStatus::Tokenized {
            return Err(DomainError::AssetNotTokenized);
        }
        self.tokenization_mut()?.is_tradable = is_tradable;
        self.updated_at = now;
        Ok(())
    }

    /// Adds `amount` to the distributed income total. Returns the new total.
    pub fn distribute_income(&mut self, amount: u64, now: DateTime<Utc>) -> DomainResult<u64> {
        if amount == 0 {
            return Err(DomainError::InvalidParameters(
                "income amount must be greater than zero".to_string(),
            ));
        }
        if self.status != AssetStatus::Tokenized {
            return Err(DomainError::AssetNotTokenized);
        }
        let token = self.tokenization_mut()?;
        token.total_income_distributed = token
            .total_income_distributed
            .checked_add(amount)
            .ok_or(DomainError::MathOverflow)?;
        token.last_income_distribution = Some(now);
        let total = token.total_income_distributed;
        self.updated_at = now;
        Ok(total)
    }

    /// Marks the token burned (used on delisting).
    pub fn burn_token(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        let token = self.tokenization_mut()?;
        token.is_burned = true;
        token.is_tradable = false;
        self.updated_at = now;
        Ok(())
    }

    /// Case-insensitive substring match over name, description and location.
    pub fn matches_query(&self, needle_lower: &str) -> bool {
        self.name.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
            || self
                .location
                .as_deref()
                .map(|l| l.to_lowercase().contains(needle_lower))
                .unwrap_or(false)
    }
}

/// Parameters for tokenizing a verified asset.
#[derive(Debug, Clone)]
pub struct TokenizationParams {
    pub symbol: String,
    pub total_shares: u64,
    pub share_price: u64,
    pub income_distribution_frequency: IncomeDistributionFrequency,
}

impl TokenizationParams {
    pub fn validate(&self, valuation: u64) -> DomainResult<()> {
        validate_symbol(&self.symbol)?;
        if self.total_shares == 0 || self.total_shares > MAX_TOTAL_SHARES {
            return Err(DomainError::InvalidParameters(format!(
                "total_shares must be between 1 and {}",
                MAX_TOTAL_SHARES
            )));
        }
        if self.share_price == 0 {
            return Err(DomainError::InvalidParameters(
                "share_price must be greater than zero".to_string(),
            ));
        }
        let implied = (self.total_shares as u128) * (self.share_price as u128);
        if implied > valuation as u128 {
            return Err(DomainError::InvalidParameters(format!(
                "total_shares * share_price ({}) exceeds the asset valuation ({})",
                implied, valuation
            )));
        }
        Ok(())
    }
}

/// Counts UTF-8 bytes, not characters.
pub fn validate_name(name: &str) -> DomainResult<()> {
    let name = name.trim();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(DomainError::InvalidParameters(format!(
            "name must be 1..={} bytes of UTF-8",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> DomainResult<()> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::InvalidParameters(format!(
            "description must be at most {} bytes of UTF-8",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}

/// Symbols are 2..=10 upper-case ASCII alphanumerics.
pub fn validate_symbol(symbol: &str) -> DomainResult<()> {
    let ok = (2..=10).contains(&symbol.len())
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !ok {
        return Err(DomainError::InvalidParameters(format!(
            "invalid token symbol '{}'",
            symbol
        )));
    }
    Ok(())
}
