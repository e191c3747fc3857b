use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::app::{Clock, ServiceError, ServiceResult};
use crate::domain::{DomainError, GovernanceConfig, Principal, Proposal, ProposalOutcome, ProposalType};
use crate::storage::ProposalStore;

#[derive(Debug, Clone)]
pub struct NewProposal {
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    pub voting_ends_at: DateTime<Utc>,
}

pub struct GovernanceService {
    store: Arc<dyn ProposalStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl GovernanceService {
    pub fn new(store: Arc<dyn ProposalStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Stored configuration, or the defaults when none was saved yet.
    pub async fn config(&self) -> ServiceResult<GovernanceConfig> {
        Ok(self
            .store
            .load_governance_config()
            .await?
            .unwrap_or_default())
    }

    pub async fn update_config(
        &self,
        principal: &Principal,
        config: GovernanceConfig,
    ) -> ServiceResult<GovernanceConfig> {
        config.validate()?;
        let _guard = self.write_lock.lock().await;
        self.store.save_governance_config(&config).await?;
        info!(actor = %principal.subject, ?config, "governance config updated");
        Ok(config)
    }

    pub async fn create_proposal(
        &self,
        principal: &Principal,
        input: NewProposal,
    ) -> ServiceResult<Proposal> {
        let config = self.config().await?;
        let proposal = Proposal::create(
            &config,
            &principal.subject,
            &input.title,
            &input.description,
            input.proposal_type,
            input.voting_ends_at,
            self.clock.now(),
        )?;
        self.store.insert_proposal(&proposal).await?;
        info!(proposal_id = %proposal.id, proposer = %proposal.proposer, "proposal created");
        Ok(proposal)
    }

    pub async fn list(&self, active_only: bool) -> ServiceResult<Vec<Proposal>> {
        Ok(self.store.list_proposals(active_only).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Proposal> {
        self.store
            .get_proposal(id)
            .await?
            .ok_or(ServiceError::Domain(DomainError::ProposalNotFound(id)))
    }

    pub async fn vote(
        &self,
        principal: &Principal,
        id: Uuid,
        vote_yes: bool,
        vote_weight: u64,
    ) -> ServiceResult<Proposal> {
        let _guard = self.write_lock.lock().await;
        let config = self.config().await?;
        let mut proposal = self.get(id).await?;
        proposal.cast_vote(&config, &principal.subject, vote_yes, vote_weight, self.clock.now())?;
        self.save(&proposal).await?;
        info!(proposal_id = %id, voter = %principal.subject, vote_yes, vote_weight, "vote cast");
        Ok(proposal)
    }

    pub async fn execute(&self, principal: &Principal, id: Uuid) -> ServiceResult<(Proposal, ProposalOutcome)> {
        let _guard = self.write_lock.lock().await;
        let mut proposal = self.get(id).await?;
        let outcome = proposal.execute(&principal.subject, self.clock.now())?;
        self.save(&proposal).await?;
        info!(proposal_id = %id, ?outcome, "proposal executed");
        Ok((proposal, outcome))
    }

    /// A row that vanished between read and write is reported as not found.
    async fn save(&self, proposal: &Proposal) -> ServiceResult<()> {
        if !self.store.update_proposal(proposal).await? {
            return Err(DomainError::ProposalNotFound(proposal.id).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ManualClock;
    use crate::domain::Role;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;

    /// Serves reads from memory but loses every update, as when a row is
    /// deleted underneath the service.
    struct VanishingStore(MemoryStore);

    #[async_trait]
    impl ProposalStore for VanishingStore {
        async fn insert_proposal(&self, proposal: &Proposal) -> anyhow::Result<()> {
            self.0.insert_proposal(proposal).await
        }
        async fn update_proposal(&self, _proposal: &Proposal) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn get_proposal(&self, id: Uuid) -> anyhow::Result<Option<Proposal>> {
            self.0.get_proposal(id).await
        }
        async fn list_proposals(&self, active_only: bool) -> anyhow::Result<Vec<Proposal>> {
            self.0.list_proposals(active_only).await
        }
        async fn load_governance_config(&self) -> anyhow::Result<Option<GovernanceConfig>> {
            self.0.load_governance_config().await
        }
        async fn save_governance_config(&self, config: &GovernanceConfig) -> anyhow::Result<()> {
            self.0.save_governance_config(config).await
        }
    }

    fn proposal_input(clock: &ManualClock) -> NewProposal {
        NewProposal {
            title: "Lower fees".into(),
            description: "Drop the transfer fee to 10 bps".into(),
            proposal_type: ProposalType::UpdateFees,
            voting_ends_at: clock.now() + Duration::days(2),
        }
    }

    #[tokio::test]
    async fn full_proposal_cycle_uses_stored_config() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = GovernanceService::new(Arc::new(MemoryStore::new()), clock.clone());
        let admin = Principal::new("root", Role::Admin);

        service
            .update_config(
                &admin,
                GovernanceConfig {
                    min_quorum_votes: 10,
                    ..GovernanceConfig::default()
                },
            )
            .await
            .unwrap();

        let p = service
            .create_proposal(
                &Principal::new("holder-1", Role::Investor),
                NewProposal {
                    title: "Lower fees".into(),
                    description: "Drop the transfer fee to 10 bps".into(),
                    proposal_type: ProposalType::UpdateFees,
                    voting_ends_at: clock.now() + Duration::days(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(p.quorum_votes, 10);

        service
            .vote(&Principal::new("a", Role::Investor), p.id, true, 8)
            .await
            .unwrap();
        service
            .vote(&Principal::new("b", Role::Investor), p.id, false, 2)
            .await
            .unwrap();

        clock.advance(Duration::days(3));
        let (executed, outcome) = service.execute(&admin, p.id).await.unwrap();
        assert_eq!(outcome, ProposalOutcome::Passed);
        assert!(executed.executed);
        assert!(service.list(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_proposal_is_not_found() {
        let service = GovernanceService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let err = service.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::ProposalNotFound(_))));
    }

    #[tokio::test]
    async fn lost_update_is_reported_as_not_found() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = GovernanceService::new(Arc::new(VanishingStore(MemoryStore::new())), clock.clone());
        let admin = Principal::new("root", Role::Admin);
        let p = service
            .create_proposal(&Principal::new("holder-1", Role::Investor), proposal_input(&clock))
            .await
            .unwrap();

        let err = service
            .vote(&Principal::new("a", Role::Investor), p.id, true, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::ProposalNotFound(id)) if id == p.id));

        clock.advance(Duration::days(3));
        let err = service.execute(&admin, p.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::ProposalNotFound(id)) if id == p.id));
    }

    #[tokio::test]
    async fn unbounded_voting_period_is_refused() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryStore::new());
        let service = GovernanceService::new(store.clone(), clock.clone());
        let admin = Principal::new("root", Role::Admin);
        let huge = GovernanceConfig {
            max_voting_period: i64::MAX,
            ..GovernanceConfig::default()
        };

        let err = service.update_config(&admin, huge.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidVotingPeriod)));
        assert_eq!(service.config().await.unwrap(), GovernanceConfig::default());

        // A config written before the cap existed must fail the request, not the task.
        store.save_governance_config(&huge).await.unwrap();
        let holder = Principal::new("holder-1", Role::Investor);
        let err = service
            .create_proposal(&holder, proposal_input(&clock))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvalidVotingPeriod)));

        service
            .update_config(&admin, GovernanceConfig::default())
            .await
            .unwrap();
        assert!(service.create_proposal(&holder, proposal_input(&clock)).await.is_ok());
    }
}
