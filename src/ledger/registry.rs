//! Election administration
//!
//! Creates elections, manages their candidate lists and drives the
//! active/completed lifecycle. Every change goes through the same
//! [`LedgerStore`] the vote ledger writes to.

use std::sync::Arc;

use uuid::Uuid;

use crate::ledger::LedgerStore;
use crate::types::{Candidate, Election, NewElection};
use crate::{Error, Result};

/// Admin operations over elections and candidates
#[derive(Clone)]
pub struct ElectionRegistry {
    store: Arc<dyn LedgerStore>,
}

impl ElectionRegistry {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Validate and store a new election. It starts active with no
    /// candidates.
    pub fn create_election(&self, input: NewElection) -> Result<Election> {
        input.validate()?;
        let election = Election::new(input);
        self.store
            .insert_election(election.clone())
            .map_err(|e| e.in_context("create_election"))?;

        tracing::info!(
            "📋 Election created: id={}, type={}, state={}",
            election.id,
            election.election_type,
            election.state
        );
        Ok(election)
    }

    /// Add a candidate to an election that has not completed
    pub fn add_candidate(
        &self,
        election_id: &Uuid,
        name: &str,
        party: &str,
    ) -> Result<Candidate> {
        if name.trim().is_empty() {
            return Err(Error::validation("candidate name must not be empty"));
        }

        let candidate = Candidate::new(*election_id, name.trim(), party.trim());
        self.store
            .insert_candidate(candidate.clone())
            .map_err(|e| e.in_context("add_candidate"))?;

        tracing::info!(
            "Candidate added: election={}, candidate={}",
            election_id,
            candidate.id
        );
        Ok(candidate)
    }

    /// Remove a candidate. Refused once the candidate has received a vote.
    pub fn remove_candidate(&self, election_id: &Uuid, candidate_id: &Uuid) -> Result<Candidate> {
        let removed = self
            .store
            .remove_candidate(election_id, candidate_id)
            .map_err(|e| e.in_context("remove_candidate"))?;

        tracing::info!(
            "Candidate removed: election={}, candidate={}",
            election_id,
            candidate_id
        );
        Ok(removed)
    }

    /// Suspend or re-open voting. Completed elections cannot be re-opened.
    pub fn set_active(&self, election_id: &Uuid, active: bool) -> Result<Election> {
        let election = self
            .store
            .update_election(election_id, &mut |election| election.set_active(active))
            .map_err(|e| e.in_context("set_active"))?;

        tracing::info!("Election {} active={}", election_id, active);
        Ok(election)
    }

    /// Close an election for good. Idempotent.
    pub fn end_election(&self, election_id: &Uuid) -> Result<Election> {
        let election = self
            .store
            .update_election(election_id, &mut |election| {
                election.end();
                Ok(())
            })
            .map_err(|e| e.in_context("end_election"))?;

        tracing::info!("🏁 Election ended: id={}", election_id);
        Ok(election)
    }

    pub fn election(&self, election_id: &Uuid) -> Result<Election> {
        self.store
            .election(election_id)
            .map_err(|e| e.in_context("election"))?
            .ok_or(Error::ElectionNotFound {
                election_id: *election_id,
            })
    }

    /// All elections, oldest first
    pub fn elections(&self) -> Result<Vec<Election>> {
        self.store.elections().map_err(|e| e.in_context("elections"))
    }

    /// Candidates in list order with their current counters
    pub fn candidates(&self, election_id: &Uuid) -> Result<Vec<Candidate>> {
        self.store
            .candidates(election_id)
            .map_err(|e| e.in_context("candidates"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryStore;
    use crate::types::ElectionType;
    use chrono::{Duration, Utc};

    fn registry() -> ElectionRegistry {
        ElectionRegistry::new(Arc::new(MemoryStore::new()))
    }

    fn new_election(title: &str) -> NewElection {
        let now = Utc::now();
        NewElection {
            title: title.to_string(),
            description: Some("By-election".to_string()),
            election_type: ElectionType::Local,
            state: "Maharashtra".to_string(),
            district: Some("Mumbai".to_string()),
            constituency: None,
            start_time: now,
            end_time: now + Duration::hours(12),
        }
    }

    #[test]
    fn test_create_and_list() {
        let registry = registry();
        let first = registry.create_election(new_election("First")).unwrap();
        let second = registry.create_election(new_election("Second")).unwrap();

        let ids: Vec<_> = registry.elections().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(registry.election(&first.id).unwrap().is_open());
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let registry = registry();
        let mut input = new_election("Backwards");
        input.end_time = input.start_time - Duration::hours(1);

        assert!(matches!(
            registry.create_election(input),
            Err(Error::Validation { .. })
        ));
        assert!(registry.elections().unwrap().is_empty());
    }

    #[test]
    fn test_candidate_order_follows_insertion() {
        let registry = registry();
        let election = registry.create_election(new_election("Ward 12")).unwrap();

        let names = ["Chitra", "Asha", "Bhanu"];
        for name in names {
            registry.add_candidate(&election.id, name, "Independent").unwrap();
        }

        let listed: Vec<_> = registry
            .candidates(&election.id)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(listed, names);
        assert!(registry.add_candidate(&election.id, "  ", "None").is_err());
    }

    #[test]
    fn test_lifecycle() {
        let registry = registry();
        let election = registry.create_election(new_election("Ward 7")).unwrap();

        assert!(!registry.set_active(&election.id, false).unwrap().is_open());
        assert!(registry.set_active(&election.id, true).unwrap().is_open());

        let ended = registry.end_election(&election.id).unwrap();
        assert!(ended.is_completed && !ended.is_active);
        assert!(registry.end_election(&election.id).is_ok());

        assert!(matches!(
            registry.set_active(&election.id, true),
            Err(Error::ElectionNotOpen { .. })
        ));
        assert!(matches!(
            registry.add_candidate(&election.id, "Late", "None"),
            Err(Error::ElectionNotOpen { .. })
        ));
    }

    #[test]
    fn test_unknown_election() {
        let registry = registry();
        let missing = Uuid::new_v4();

        assert!(matches!(
            registry.election(&missing),
            Err(Error::ElectionNotFound { .. })
        ));
        assert!(matches!(
            registry.end_election(&missing),
            Err(Error::ElectionNotFound { .. })
        ));
        assert!(matches!(
            registry.add_candidate(&missing, "Asha", "None"),
            Err(Error::ElectionNotFound { .. })
        ));
        assert!(matches!(
            registry.candidates(&missing),
            Err(Error::ElectionNotFound { .. })
        ));
    }
}
