//! Ledger storage
//!
//! [`LedgerStore`] is the persistence seam. Implementations must make
//! [`LedgerStore::append_vote`] atomic: the (voter, election) uniqueness
//! check, the ledger append and the candidate counter increment either all
//! happen or none do. Checking uniqueness in the caller and writing
//! afterwards is not enough, two casts from the same voter can interleave
//! between the check and the write.
//!
//! [`MemoryStore`] is the in-process implementation. Each election has its
//! own ballot book behind a mutex, so casts into different elections never
//! contend.
//!
//! Lock order: `elections` -> `books` -> a book -> `candidates`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::crypto::ProofInput;
use crate::types::{Candidate, Election, Hash, Vote};
use crate::{Error, Result, storage_error};

/// A vote that passed the caller's checks and waits to be sealed and
/// appended
#[derive(Debug, Clone)]
pub struct PendingVote {
    pub voter_id: String,
    pub election_id: Uuid,
    pub candidate_id: Uuid,
    pub jurisdiction_state: String,
    pub timestamp: DateTime<Utc>,
    pub nonce: String,
}

/// Computes a proof hash once the store has fixed sequence and chain link
pub type Seal<'a> = &'a dyn Fn(&ProofInput<'_>) -> Result<Hash>;

/// Candidates and ledger rows of one election as of the same instant
#[derive(Debug, Clone, Default)]
pub struct TallySnapshot {
    /// List order, counters filled in
    pub candidates: Vec<Candidate>,
    /// Append order
    pub votes: Vec<Vote>,
}

/// Persistence for elections, candidates and the vote ledger
pub trait LedgerStore: Send + Sync {
    fn insert_election(&self, election: Election) -> Result<()>;

    fn election(&self, election_id: &Uuid) -> Result<Option<Election>>;

    /// All elections, oldest first
    fn elections(&self) -> Result<Vec<Election>>;

    /// Apply `update` to a stored election and return the result. Nothing is
    /// written if `update` fails or leaves a completed election active or
    /// reopened.
    fn update_election(
        &self,
        election_id: &Uuid,
        update: &mut dyn FnMut(&mut Election) -> Result<()>,
    ) -> Result<Election>;

    /// Store a candidate row and append its id to the election's list.
    /// Refused once the election is completed.
    fn insert_candidate(&self, candidate: Candidate) -> Result<()>;

    /// Remove a candidate that has not received any votes
    fn remove_candidate(&self, election_id: &Uuid, candidate_id: &Uuid) -> Result<Candidate>;

    /// Candidates of an election in list order, counters filled in
    fn candidates(&self, election_id: &Uuid) -> Result<Vec<Candidate>>;

    /// Atomically check uniqueness, seal and append a vote, and bump the
    /// candidate counter.
    ///
    /// Re-checks that the election is open and lists the candidate, so a
    /// concurrent admin change cannot slip between the caller's checks and
    /// the write.
    fn append_vote(&self, pending: PendingVote, seal: Seal<'_>) -> Result<Vote>;

    fn find_vote(&self, election_id: &Uuid, voter_id: &str) -> Result<Option<Vote>>;

    /// Ledger rows of an election in append order
    fn votes(&self, election_id: &Uuid) -> Result<Vec<Vote>>;

    /// Candidates with their counters and the ledger rows, read without any
    /// append landing in between
    fn snapshot(&self, election_id: &Uuid) -> Result<TallySnapshot>;
}

/// Votes, voter index and counters of one election
#[derive(Debug, Default)]
struct BallotBook {
    votes: Vec<Vote>,
    /// voter id -> index into `votes`
    voters: HashMap<String, usize>,
    /// candidate id -> denormalized vote count
    counters: HashMap<Uuid, u64>,
}

/// In-memory [`LedgerStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    elections: RwLock<HashMap<Uuid, Election>>,
    /// Creation order of `elections`
    election_order: RwLock<Vec<Uuid>>,
    books: RwLock<HashMap<Uuid, Arc<Mutex<BallotBook>>>>,
    candidates: RwLock<HashMap<Uuid, Candidate>>,
}

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| storage_error!(what, "lock poisoned"))
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| storage_error!(what, "lock poisoned"))
}

fn lock_book(book: &Mutex<BallotBook>) -> Result<MutexGuard<'_, BallotBook>> {
    book.lock()
        .map_err(|_| storage_error!("ballot book", "lock poisoned"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn book(&self, election_id: &Uuid) -> Result<Arc<Mutex<BallotBook>>> {
        read(&self.books, "ballot books")?
            .get(election_id)
            .cloned()
            .ok_or(Error::ElectionNotFound {
                election_id: *election_id,
            })
    }

    /// Candidate rows in list order with counters taken from `book`
    fn counted(&self, election: &Election, book: &BallotBook) -> Result<Vec<Candidate>> {
        let candidates = read(&self.candidates, "candidates")?;
        election
            .candidate_ids
            .iter()
            .map(|id| {
                let row = candidates
                    .get(id)
                    .ok_or_else(|| Error::internal(format!("candidate row {id} missing")))?;
                Ok(Candidate {
                    vote_count: book.counters.get(id).copied().unwrap_or(0),
                    ..row.clone()
                })
            })
            .collect()
    }
}

impl LedgerStore for MemoryStore {
    fn insert_election(&self, election: Election) -> Result<()> {
        let mut elections = write(&self.elections, "elections")?;
        let mut order = write(&self.election_order, "election order")?;
        let mut books = write(&self.books, "ballot books")?;

        if elections.contains_key(&election.id) {
            return Err(Error::validation(format!(
                "election {} already exists",
                election.id
            )));
        }

        books.insert(election.id, Arc::new(Mutex::new(BallotBook::default())));
        order.push(election.id);
        elections.insert(election.id, election);
        Ok(())
    }

    fn election(&self, election_id: &Uuid) -> Result<Option<Election>> {
        Ok(read(&self.elections, "elections")?.get(election_id).cloned())
    }

    fn elections(&self) -> Result<Vec<Election>> {
        let elections = read(&self.elections, "elections")?;
        let order = read(&self.election_order, "election order")?;
        Ok(order
            .iter()
            .filter_map(|id| elections.get(id).cloned())
            .collect())
    }

    fn update_election(
        &self,
        election_id: &Uuid,
        update: &mut dyn FnMut(&mut Election) -> Result<()>,
    ) -> Result<Election> {
        let mut elections = write(&self.elections, "elections")?;
        let stored = elections
            .get_mut(election_id)
            .ok_or(Error::ElectionNotFound {
                election_id: *election_id,
            })?;

        let mut updated = stored.clone();
        update(&mut updated)?;
        if updated.is_completed && updated.is_active {
            return Err(Error::validation(format!(
                "election {election_id} is completed and cannot be active"
            )));
        }
        if stored.is_completed && !updated.is_completed {
            return Err(Error::validation(format!(
                "election {election_id} is completed and cannot be reopened"
            )));
        }
        // Candidate membership is owned by insert/remove_candidate
        updated.id = stored.id;
        updated.candidate_ids = stored.candidate_ids.clone();
        *stored = updated.clone();
        Ok(updated)
    }

    fn insert_candidate(&self, candidate: Candidate) -> Result<()> {
        let mut elections = write(&self.elections, "elections")?;
        let election = elections
            .get_mut(&candidate.election_id)
            .ok_or(Error::ElectionNotFound {
                election_id: candidate.election_id,
            })?;
        if election.is_completed {
            return Err(Error::ElectionNotOpen {
                election_id: candidate.election_id,
            });
        }
        let book = self.book(&candidate.election_id)?;
        let mut book = lock_book(&book)?;
        let mut candidates = write(&self.candidates, "candidates")?;

        if candidates.contains_key(&candidate.id) {
            return Err(Error::validation(format!(
                "candidate {} already exists",
                candidate.id
            )));
        }

        election.candidate_ids.push(candidate.id);
        book.counters.insert(candidate.id, 0);
        candidates.insert(
            candidate.id,
            Candidate {
                vote_count: 0,
                ..candidate
            },
        );
        Ok(())
    }

    fn remove_candidate(&self, election_id: &Uuid, candidate_id: &Uuid) -> Result<Candidate> {
        let mut elections = write(&self.elections, "elections")?;
        let election = elections
            .get_mut(election_id)
            .ok_or(Error::ElectionNotFound {
                election_id: *election_id,
            })?;
        if !election.has_candidate(candidate_id) {
            return Err(Error::CandidateNotFound {
                election_id: *election_id,
                candidate_id: *candidate_id,
            });
        }

        let book = self.book(election_id)?;
        let mut book = lock_book(&book)?;
        let received = book.counters.get(candidate_id).copied().unwrap_or(0);
        if received > 0 {
            return Err(Error::validation(format!(
                "candidate {candidate_id} has {received} recorded votes and cannot be removed"
            )));
        }

        let mut candidates = write(&self.candidates, "candidates")?;
        election.candidate_ids.retain(|id| id != candidate_id);
        book.counters.remove(candidate_id);
        candidates
            .remove(candidate_id)
            .ok_or_else(|| Error::internal(format!("candidate row {candidate_id} missing")))
    }

    fn candidates(&self, election_id: &Uuid) -> Result<Vec<Candidate>> {
        let elections = read(&self.elections, "elections")?;
        let election = elections.get(election_id).ok_or(Error::ElectionNotFound {
            election_id: *election_id,
        })?;
        let book = self.book(election_id)?;
        let book = lock_book(&book)?;
        self.counted(election, &book)
    }

    fn append_vote(&self, pending: PendingVote, seal: Seal<'_>) -> Result<Vote> {
        // Held shared for the whole append so an election cannot be closed,
        // nor a candidate removed, halfway through.
        let elections = read(&self.elections, "elections")?;
        let election_id = pending.election_id;
        let election = elections
            .get(&election_id)
            .filter(|election| election.is_open())
            .ok_or(Error::ElectionNotOpen { election_id })?;
        if !election.has_candidate(&pending.candidate_id) {
            return Err(Error::CandidateNotFound {
                election_id,
                candidate_id: pending.candidate_id,
            });
        }

        let book = self.book(&election_id)?;
        let mut book = lock_book(&book)?;

        if book.voters.contains_key(&pending.voter_id) {
            return Err(Error::DuplicateVote { election_id });
        }

        let sequence = book.votes.len() as u64 + 1;
        let previous_proof = book.votes.last().map(|vote| vote.proof);
        let proof = seal(&ProofInput {
            voter_id: &pending.voter_id,
            election_id,
            candidate_id: pending.candidate_id,
            sequence,
            nonce: &pending.nonce,
            timestamp: pending.timestamp,
            previous_proof: previous_proof.as_ref().map(hex::encode),
        })?;

        let vote = Vote {
            vote_id: Uuid::new_v4(),
            voter_id: pending.voter_id,
            election_id,
            candidate_id: pending.candidate_id,
            jurisdiction_state: pending.jurisdiction_state,
            timestamp: pending.timestamp,
            sequence,
            nonce: pending.nonce,
            previous_proof,
            proof,
        };

        // Nothing below can fail: row, index and counter land together.
        let index = book.votes.len();
        *book.counters.entry(vote.candidate_id).or_insert(0) += 1;
        book.voters.insert(vote.voter_id.clone(), index);
        book.votes.push(vote.clone());

        Ok(vote)
    }

    fn find_vote(&self, election_id: &Uuid, voter_id: &str) -> Result<Option<Vote>> {
        let book = match self.book(election_id) {
            Ok(book) => book,
            Err(Error::ElectionNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let book = lock_book(&book)?;
        Ok(book
            .voters
            .get(voter_id)
            .and_then(|&index| book.votes.get(index))
            .cloned())
    }

    fn votes(&self, election_id: &Uuid) -> Result<Vec<Vote>> {
        let book = self.book(election_id)?;
        let book = lock_book(&book)?;
        Ok(book.votes.clone())
    }

    fn snapshot(&self, election_id: &Uuid) -> Result<TallySnapshot> {
        let elections = read(&self.elections, "elections")?;
        let election = elections.get(election_id).ok_or(Error::ElectionNotFound {
            election_id: *election_id,
        })?;
        let book = self.book(election_id)?;
        let book = lock_book(&book)?;

        Ok(TallySnapshot {
            candidates: self.counted(election, &book)?,
            votes: book.votes.clone(),
        })
    }
}

impl MemoryStore {
    /// Distinct voters recorded for an election
    pub fn voter_count(&self, election_id: &Uuid) -> Result<usize> {
        let book = self.book(election_id)?;
        let book = lock_book(&book)?;
        Ok(book.voters.len())
    }
}
