//! Vote ledger
//!
//! [`VoteLedger`] is the casting side of the engine:
//! 1. Decode the voter identifier (shape only)
//! 2. Require an open election that lists the chosen candidate
//! 3. Require the voter's jurisdiction to be eligible
//! 4. Seal and append the vote through the store, which enforces
//!    one vote per (voter, election) atomically and bumps the candidate
//!    counter in the same step
//!
//! Every failure is returned to the caller. None are retried here.

pub mod registry;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::crypto::{AnonymizedHandle, Anonymizer, CryptoUtils, ProofSealer};
use crate::eligibility;
use crate::identifier::IdentifierCodec;
use crate::types::{Election, Vote};
use crate::{Error, Result};

pub use registry::ElectionRegistry;
pub use store::{LedgerStore, MemoryStore, PendingVote, TallySnapshot};

/// Source of vote timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What a voter gets back after a successful cast. Carries the anonymized
/// handle, never the raw identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub election_id: Uuid,
    pub candidate_id: Uuid,
    pub voter_handle: AnonymizedHandle,
    /// `0x`-prefixed SHA-256 proof hash
    pub proof: String,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// Public view of a stored vote, for a voter checking their own ballot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteProof {
    pub election_id: Uuid,
    pub candidate_id: Uuid,
    pub voter_handle: AnonymizedHandle,
    pub jurisdiction_state: String,
    pub proof: String,
    pub previous_proof: Option<String>,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// Casting and lookup over a [`LedgerStore`]
pub struct VoteLedger {
    store: Arc<dyn LedgerStore>,
    codec: IdentifierCodec,
    anonymizer: Anonymizer,
    sealer: ProofSealer,
    clock: Arc<dyn Clock>,
}

impl VoteLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        codec: IdentifierCodec,
        anonymizer: Anonymizer,
        sealer: ProofSealer,
    ) -> Self {
        Self {
            store,
            codec,
            anonymizer,
            sealer,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build with the built-in code tables and the configured secret
    pub fn from_config(store: Arc<dyn LedgerStore>, config: &SecurityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            store,
            IdentifierCodec::default(),
            Anonymizer::from_config(config)?,
            ProofSealer::from_config(config),
        ))
    }

    /// Create for testing over a fresh in-memory store
    pub fn for_testing() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            IdentifierCodec::default(),
            Anonymizer::for_testing(),
            ProofSealer::default(),
        )
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn codec(&self) -> &IdentifierCodec {
        &self.codec
    }

    pub fn anonymizer(&self) -> &Anonymizer {
        &self.anonymizer
    }

    pub fn sealer(&self) -> &ProofSealer {
        &self.sealer
    }

    /// Cast a vote for `candidate_id` in `election_id`
    pub fn cast_vote(
        &self,
        voter_id: &str,
        election_id: &Uuid,
        candidate_id: &Uuid,
    ) -> Result<VoteReceipt> {
        let decoded = self.codec.decode(voter_id)?;
        let handle = self.anonymizer.anonymize(voter_id);

        let election = self
            .store
            .election(election_id)
            .map_err(|e| e.in_context(format!("cast_vote election={election_id}")))?
            .filter(Election::is_open)
            .ok_or(Error::ElectionNotOpen {
                election_id: *election_id,
            })
            .inspect_err(|e| tracing::warn!("Vote rejected: voter={handle}, {e}"))?;

        if !election.has_candidate(candidate_id) {
            let err = Error::CandidateNotFound {
                election_id: *election_id,
                candidate_id: *candidate_id,
            };
            tracing::warn!("Vote rejected: voter={handle}, {err}");
            return Err(err);
        }

        let jurisdiction = decoded.jurisdiction();
        if !eligibility::is_eligible(&jurisdiction, &election) {
            let err = Error::NotEligible {
                election_id: *election_id,
            };
            tracing::warn!(
                "Vote rejected: voter={handle}, state={}, {err}",
                jurisdiction.state
            );
            return Err(err);
        }

        let pending = PendingVote {
            voter_id: voter_id.to_string(),
            election_id: *election_id,
            candidate_id: *candidate_id,
            jurisdiction_state: jurisdiction.state,
            timestamp: self.clock.now(),
            nonce: self.sealer.nonce(),
        };

        let vote = self
            .store
            .append_vote(pending, &|input| self.sealer.seal(input))
            .map_err(|e| {
                e.in_context(format!(
                    "cast_vote election={election_id} candidate={candidate_id}"
                ))
            })
            .inspect_err(|e| tracing::warn!("Vote rejected: voter={handle}, {e}"))?;

        tracing::info!(
            "🗳️ Vote recorded: election={}, seq={}, voter={}",
            election_id,
            vote.sequence,
            handle
        );

        Ok(VoteReceipt {
            election_id: vote.election_id,
            candidate_id: vote.candidate_id,
            voter_handle: handle,
            proof: CryptoUtils::hash_to_hex(&vote.proof),
            sequence: vote.sequence,
            timestamp: vote.timestamp,
        })
    }

    /// Look up the caller's own vote. Returns `None` when the voter has not
    /// voted in the election.
    pub fn verify_vote(&self, election_id: &Uuid, voter_id: &str) -> Result<Option<VoteProof>> {
        let vote = self
            .store
            .find_vote(election_id, voter_id)
            .map_err(|e| e.in_context(format!("verify_vote election={election_id}")))?;

        Ok(vote.map(|vote| self.public_view(&vote)))
    }

    /// Elections the voter may take part in, re-evaluated against the
    /// current election list on every call
    pub fn eligible_elections(&self, voter_id: &str) -> Result<Vec<Election>> {
        let jurisdiction = self.codec.decode(voter_id)?.jurisdiction();
        let elections = self
            .store
            .elections()
            .map_err(|e| e.in_context("eligible_elections"))?;

        Ok(eligibility::eligible_elections(&jurisdiction, &elections)
            .into_iter()
            .cloned()
            .collect())
    }

    fn public_view(&self, vote: &Vote) -> VoteProof {
        VoteProof {
            election_id: vote.election_id,
            candidate_id: vote.candidate_id,
            voter_handle: self.anonymizer.anonymize(&vote.voter_id),
            jurisdiction_state: vote.jurisdiction_state.clone(),
            proof: CryptoUtils::hash_to_hex(&vote.proof),
            previous_proof: vote.previous_proof.as_ref().map(CryptoUtils::hash_to_hex),
            sequence: vote.sequence,
            timestamp: vote.timestamp,
        }
    }
}
