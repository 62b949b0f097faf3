//! Tally engine
//!
//! Results are derived from the ledger on every call. The candidate
//! counters kept by the store are only cross-checked, never trusted: any
//! divergence is reported in [`RankedResults::discrepancies`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{CryptoUtils, ProofSealer};
use crate::ledger::{LedgerStore, TallySnapshot};
use crate::types::Hash;
use crate::{Error, Result};

/// One row of an election's results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: Uuid,
    pub name: String,
    pub party: String,
    pub vote_count: u64,
    /// Share of the total, one decimal place
    pub percentage: f64,
}

/// A candidate whose stored counter disagrees with the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterDiscrepancy {
    pub candidate_id: Uuid,
    pub ledger_count: u64,
    /// `None` when ledger rows name a candidate the election no longer lists
    pub counter_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResults {
    pub election_id: Uuid,
    pub total_votes: u64,
    /// Descending by votes; ties keep candidate list order
    pub candidates: Vec<CandidateResult>,
    pub discrepancies: Vec<CounterDiscrepancy>,
}

impl RankedResults {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn leader(&self) -> Option<&CandidateResult> {
        self.candidates.first().filter(|c| c.vote_count > 0)
    }
}

/// Vote activity of an election over time, bucketed in UTC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub election_id: Uuid,
    pub total_votes: u64,
    /// Votes per hour of day, index 0 is 00:00-00:59
    pub by_hour: [u64; 24],
    pub by_date: BTreeMap<NaiveDate, u64>,
    pub first_vote: Option<DateTime<Utc>>,
    pub last_vote: Option<DateTime<Utc>>,
}

/// Outcome of walking an election's proof chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainReport {
    pub election_id: Uuid,
    /// Rows checked before stopping
    pub checked: u64,
    /// Sequence of the first row that fails verification
    pub broken_at: Option<u64>,
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        self.broken_at.is_none()
    }
}

/// Read-side aggregation over a [`LedgerStore`]
pub struct TallyEngine {
    store: Arc<dyn LedgerStore>,
    sealer: ProofSealer,
}

/// round(count / total * 1000) / 10, and 0 for an empty election
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}

impl TallyEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            sealer: ProofSealer::default(),
        }
    }

    /// Ranked per-candidate results, counted from the ledger
    pub fn compute_results(&self, election_id: &Uuid) -> Result<RankedResults> {
        let ctx = |e: Error| e.in_context(format!("compute_results election={election_id}"));

        if self.store.election(election_id).map_err(ctx)?.is_none() {
            return Err(Error::ElectionNotFound {
                election_id: *election_id,
            });
        }
        let TallySnapshot { candidates, votes } =
            self.store.snapshot(election_id).map_err(ctx)?;

        let mut ledger_counts: HashMap<Uuid, u64> = HashMap::new();
        for vote in &votes {
            *ledger_counts.entry(vote.candidate_id).or_insert(0) += 1;
        }
        let total_votes = votes.len() as u64;

        let mut discrepancies = Vec::new();
        let mut results: Vec<CandidateResult> = candidates
            .iter()
            .map(|candidate| {
                let vote_count = ledger_counts.remove(&candidate.id).unwrap_or(0);
                if vote_count != candidate.vote_count {
                    discrepancies.push(CounterDiscrepancy {
                        candidate_id: candidate.id,
                        ledger_count: vote_count,
                        counter_count: Some(candidate.vote_count),
                    });
                }
                CandidateResult {
                    candidate_id: candidate.id,
                    name: candidate.name.clone(),
                    party: candidate.party.clone(),
                    vote_count,
                    percentage: percentage(vote_count, total_votes),
                }
            })
            .collect();

        // Rows for candidates no longer listed
        let mut orphans: Vec<_> = ledger_counts.into_iter().collect();
        orphans.sort();
        discrepancies.extend(orphans.into_iter().map(|(candidate_id, ledger_count)| {
            CounterDiscrepancy {
                candidate_id,
                ledger_count,
                counter_count: None,
            }
        }));

        if !discrepancies.is_empty() {
            tracing::error!(
                "Counter drift in election {}: {} candidate(s) disagree with the ledger",
                election_id,
                discrepancies.len()
            );
        }

        // Stable: equal counts keep list order
        results.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));

        tracing::debug!(
            "Results computed: election={}, total_votes={}",
            election_id,
            total_votes
        );

        Ok(RankedResults {
            election_id: *election_id,
            total_votes,
            candidates: results,
            discrepancies,
        })
    }

    /// Votes bucketed by UTC hour of day and calendar date
    pub fn compute_time_series(&self, election_id: &Uuid) -> Result<TimeSeries> {
        let votes = self
            .store
            .votes(election_id)
            .map_err(|e| e.in_context(format!("compute_time_series election={election_id}")))?;

        let mut series = TimeSeries {
            election_id: *election_id,
            total_votes: votes.len() as u64,
            by_hour: [0; 24],
            by_date: BTreeMap::new(),
            first_vote: None,
            last_vote: None,
        };

        for vote in &votes {
            let at = vote.timestamp;
            series.by_hour[at.hour() as usize] += 1;
            *series.by_date.entry(at.date_naive()).or_insert(0) += 1;
            series.first_vote = Some(series.first_vote.map_or(at, |first| first.min(at)));
            series.last_vote = Some(series.last_vote.map_or(at, |last| last.max(at)));
        }

        Ok(series)
    }

    /// Recompute every proof of an election in sequence order and check the
    /// links between them. Stops at the first broken row.
    pub fn verify_chain(&self, election_id: &Uuid) -> Result<ChainReport> {
        let votes = self
            .store
            .votes(election_id)
            .map_err(|e| e.in_context(format!("verify_chain election={election_id}")))?;

        let mut report = ChainReport {
            election_id: *election_id,
            checked: 0,
            broken_at: None,
        };
        let mut previous: Option<Hash> = None;

        for (index, vote) in votes.iter().enumerate() {
            let expected_sequence = index as u64 + 1;
            let linked = match (&previous, &vote.previous_proof) {
                (None, None) => true,
                (Some(prev), Some(link)) => CryptoUtils::constant_time_eq(prev, link),
                _ => false,
            };

            if vote.sequence != expected_sequence || !linked || !self.sealer.verify(vote)? {
                tracing::error!(
                    "Proof chain broken: election={}, sequence={}",
                    election_id,
                    vote.sequence
                );
                report.broken_at = Some(vote.sequence);
                return Ok(report);
            }

            report.checked += 1;
            previous = Some(vote.proof);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ElectionRegistry, MemoryStore, PendingVote};
    use crate::types::{Candidate, Election, ElectionType, Hash, NewElection, Vote};
    use chrono::{Duration, TimeZone};

    fn setup(names: &[&str]) -> (Arc<MemoryStore>, TallyEngine, Uuid, Vec<Uuid>) {
        let store = Arc::new(MemoryStore::new());
        let registry = ElectionRegistry::new(store.clone());
        let now = Utc::now();
        let election = registry
            .create_election(NewElection {
                title: "General".to_string(),
                description: None,
                election_type: ElectionType::National,
                state: "national".to_string(),
                district: None,
                constituency: None,
                start_time: now,
                end_time: now + Duration::days(1),
            })
            .unwrap();
        let ids = names
            .iter()
            .map(|name| registry.add_candidate(&election.id, name, "P").unwrap().id)
            .collect();

        (store.clone(), TallyEngine::new(store), election.id, ids)
    }

    fn cast(
        store: &MemoryStore,
        voter: &str,
        election_id: Uuid,
        candidate_id: Uuid,
        at: DateTime<Utc>,
    ) -> Vote {
        let sealer = ProofSealer::default();
        store
            .append_vote(
                PendingVote {
                    voter_id: voter.to_string(),
                    election_id,
                    candidate_id,
                    jurisdiction_state: "Delhi".to_string(),
                    timestamp: at,
                    nonce: sealer.nonce(),
                },
                &|input| sealer.seal(input),
            )
            .unwrap()
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(1, 8), 12.5);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn test_two_to_one() {
        let (store, engine, election_id, ids) = setup(&["A", "B"]);
        let now = Utc::now();
        cast(&store, "V1", election_id, ids[0], now);
        cast(&store, "V2", election_id, ids[1], now);
        cast(&store, "V3", election_id, ids[0], now);

        let results = engine.compute_results(&election_id).unwrap();
        assert_eq!(results.total_votes, 3);
        assert!(results.is_consistent());

        let rows: Vec<_> = results
            .candidates
            .iter()
            .map(|c| (c.name.as_str(), c.vote_count, c.percentage))
            .collect();
        assert_eq!(rows, vec![("A", 2, 66.7), ("B", 1, 33.3)]);
        assert_eq!(results.leader().unwrap().name, "A");
    }

    #[test]
    fn test_ties_keep_list_order() {
        let (store, engine, election_id, ids) = setup(&["A", "B", "C"]);
        let now = Utc::now();
        cast(&store, "V1", election_id, ids[2], now);
        cast(&store, "V2", election_id, ids[1], now);

        let names: Vec<_> = engine
            .compute_results(&election_id)
            .unwrap()
            .candidates
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_empty_election() {
        let (_store, engine, election_id, _) = setup(&["A", "B"]);
        let results = engine.compute_results(&election_id).unwrap();

        assert_eq!(results.total_votes, 0);
        assert!(results.candidates.iter().all(|c| c.percentage == 0.0));
        assert!(results.leader().is_none());

        let series = engine.compute_time_series(&election_id).unwrap();
        assert_eq!(series.total_votes, 0);
        assert!(series.first_vote.is_none() && series.last_vote.is_none());
        assert!(series.by_date.is_empty());
    }

    #[test]
    fn test_unknown_election_is_an_error() {
        let (_store, engine, _, _) = setup(&["A"]);
        let missing = Uuid::new_v4();

        assert!(matches!(
            engine.compute_results(&missing),
            Err(Error::ElectionNotFound { .. })
        ));
        assert!(engine.compute_time_series(&missing).is_err());
    }

    #[test]
    fn test_time_series_buckets() {
        let (store, engine, election_id, ids) = setup(&["A"]);
        let day_one = Utc.with_ymd_and_hms(2026, 3, 1, 9, 15, 0).unwrap();
        let day_two = Utc.with_ymd_and_hms(2026, 3, 2, 9, 45, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap();

        cast(&store, "V1", election_id, ids[0], day_two);
        cast(&store, "V2", election_id, ids[0], day_one);
        cast(&store, "V3", election_id, ids[0], late);

        let series = engine.compute_time_series(&election_id).unwrap();
        assert_eq!(series.total_votes, 3);
        assert_eq!(series.by_hour[9], 2);
        assert_eq!(series.by_hour[23], 1);
        assert_eq!(series.by_hour.iter().sum::<u64>(), 3);
        assert_eq!(series.by_date[&day_one.date_naive()], 2);
        assert_eq!(series.by_date[&day_two.date_naive()], 1);
        assert_eq!(series.first_vote, Some(day_one));
        assert_eq!(series.last_vote, Some(day_two));
    }

    #[test]
    fn test_chain_verifies() {
        let (store, engine, election_id, ids) = setup(&["A", "B"]);
        for (i, voter) in ["V1", "V2", "V3"].iter().enumerate() {
            cast(&store, voter, election_id, ids[i % 2], Utc::now());
        }

        let report = engine.verify_chain(&election_id).unwrap();
        assert!(report.is_intact());
        assert_eq!(report.checked, 3);
    }

    /// Store that serves a fixed, hand-edited ledger
    struct TamperedStore {
        inner: MemoryStore,
        votes: Vec<Vote>,
        counter_bump: u64,
    }

    impl LedgerStore for TamperedStore {
        fn insert_election(&self, election: Election) -> Result<()> {
            self.inner.insert_election(election)
        }
        fn election(&self, election_id: &Uuid) -> Result<Option<Election>> {
            self.inner.election(election_id)
        }
        fn elections(&self) -> Result<Vec<Election>> {
            self.inner.elections()
        }
        fn update_election(
            &self,
            election_id: &Uuid,
            update: &mut dyn FnMut(&mut Election) -> Result<()>,
        ) -> Result<Election> {
            self.inner.update_election(election_id, update)
        }
        fn insert_candidate(&self, candidate: Candidate) -> Result<()> {
            self.inner.insert_candidate(candidate)
        }
        fn remove_candidate(&self, election_id: &Uuid, candidate_id: &Uuid) -> Result<Candidate> {
            self.inner.remove_candidate(election_id, candidate_id)
        }
        fn candidates(&self, election_id: &Uuid) -> Result<Vec<Candidate>> {
            let mut candidates = self.inner.candidates(election_id)?;
            if let Some(first) = candidates.first_mut() {
                first.vote_count += self.counter_bump;
            }
            Ok(candidates)
        }
        fn append_vote(
            &self,
            pending: PendingVote,
            seal: crate::ledger::store::Seal<'_>,
        ) -> Result<Vote> {
            self.inner.append_vote(pending, seal)
        }
        fn find_vote(&self, election_id: &Uuid, voter_id: &str) -> Result<Option<Vote>> {
            self.inner.find_vote(election_id, voter_id)
        }
        fn votes(&self, _election_id: &Uuid) -> Result<Vec<Vote>> {
            Ok(self.votes.clone())
        }
        fn snapshot(&self, election_id: &Uuid) -> Result<TallySnapshot> {
            Ok(TallySnapshot {
                candidates: self.candidates(election_id)?,
                votes: self.votes(election_id)?,
            })
        }
    }

    fn tampered(edit: impl FnOnce(&mut Vec<Vote>), counter_bump: u64) -> (TallyEngine, Uuid) {
        let (store, engine, election_id, ids) = setup(&["A", "B"]);
        drop(engine);
        for (i, voter) in ["V1", "V2", "V3"].iter().enumerate() {
            cast(&store, voter, election_id, ids[i % 2], Utc::now());
        }

        let mut votes = store.votes(&election_id).unwrap();
        edit(&mut votes);

        let inner = Arc::into_inner(store).unwrap();
        let engine = TallyEngine::new(Arc::new(TamperedStore {
            inner,
            votes,
            counter_bump,
        }));
        (engine, election_id)
    }

    #[test]
    fn test_chain_detects_edit() {
        let (engine, election_id) = tampered(|votes| votes[1].candidate_id = Uuid::new_v4(), 0);
        let report = engine.verify_chain(&election_id).unwrap();
        assert_eq!(report.broken_at, Some(2));
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn test_chain_detects_dropped_row() {
        let (engine, election_id) = tampered(|votes| { votes.remove(0); }, 0);
        let report = engine.verify_chain(&election_id).unwrap();
        assert_eq!(report.broken_at, Some(2));
        assert_eq!(report.checked, 0);
    }

    #[test]
    fn test_chain_detects_relinked_row() {
        let forged: Hash = [7u8; 32];
        let (engine, election_id) = tampered(|votes| votes[2].previous_proof = Some(forged), 0);
        let report = engine.verify_chain(&election_id).unwrap();
        assert_eq!(report.broken_at, Some(3));
    }

    #[test]
    fn test_counter_drift_is_surfaced() {
        let (engine, election_id) = tampered(|_| {}, 4);
        let results = engine.compute_results(&election_id).unwrap();

        assert!(!results.is_consistent());
        assert_eq!(results.discrepancies.len(), 1);
        let drift = &results.discrepancies[0];
        assert_eq!(drift.ledger_count, 2);
        assert_eq!(drift.counter_count, Some(6));
        // Counts still come from the ledger
        assert_eq!(results.total_votes, 3);
        assert_eq!(results.candidates[0].vote_count, 2);
    }

    #[test]
    fn test_orphaned_rows_are_surfaced() {
        let stranger = Uuid::new_v4();
        let (engine, election_id) = tampered(move |votes| votes[0].candidate_id = stranger, 0);
        let results = engine.compute_results(&election_id).unwrap();

        let orphan = results
            .discrepancies
            .iter()
            .find(|d| d.candidate_id == stranger)
            .unwrap();
        assert_eq!(orphan.counter_count, None);
        assert_eq!(orphan.ledger_count, 1);
    }
}
