//! # Core Types for the Election Engine
//!
//! This module defines the records the engine reads and writes: elections,
//! candidates and ledger entries, plus the jurisdiction tuple used for
//! eligibility decisions.
//!
//! ## Type Categories
//!
//! ### Cryptographic Primitives
//! - [`type@Hash`]: 32-byte digests (proof hashes, chain links)
//!
//! ### Core Entities
//! - [`Election`]: election metadata, scope, lifecycle flags and candidate ids
//! - [`Candidate`]: a candidate row with its denormalized vote counter
//! - [`Vote`]: an immutable ledger entry
//! - [`Jurisdiction`]: the (state, district, constituency) tuple of a voter
//!
//! ## Usage Examples
//!
//! ```rust
//! use election_core::types::*;
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let mut election = Election::new(NewElection {
//!     title: "Rajasthan Assembly 2026".to_string(),
//!     description: None,
//!     election_type: ElectionType::State,
//!     state: "Rajasthan".to_string(),
//!     district: None,
//!     constituency: None,
//!     start_time: now,
//!     end_time: now + Duration::days(1),
//! });
//!
//! assert!(election.is_open());
//! election.end();
//! assert!(election.is_completed && !election.is_active);
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A 32-byte digest (SHA-256 proof hashes and chain links)
pub type Hash = [u8; 32];

/// The closed set of election kinds.
///
/// The type doubles as the eligibility scope: see
/// [`crate::eligibility::is_eligible`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionType {
    /// Nationwide election, open to every voter
    #[serde(alias = "lok-sabha")]
    National,
    /// State assembly election
    #[serde(alias = "state-assembly")]
    State,
    /// Local body election
    Local,
    /// Municipal election
    Municipal,
}

impl ElectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::National => "national",
            Self::State => "state",
            Self::Local => "local",
            Self::Municipal => "municipal",
        }
    }
}

impl fmt::Display for ElectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "national" | "lok-sabha" => Ok(Self::National),
            "state" | "state-assembly" => Ok(Self::State),
            "local" => Ok(Self::Local),
            "municipal" => Ok(Self::Municipal),
            _ => Err(Error::validation(format!("unknown election type '{s}'"))),
        }
    }
}

/// A voter's (state, district, constituency) tuple, by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub state: String,
    pub district: String,
    pub constituency: String,
}

/// Admin input for creating an election
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewElection {
    pub title: String,
    pub description: Option<String>,
    pub election_type: ElectionType,
    pub state: String,
    pub district: Option<String>,
    pub constituency: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewElection {
    /// Reject inputs the admin console should never have submitted
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title must not be empty"));
        }
        if self.state.trim().is_empty() {
            return Err(Error::validation("state must not be empty"));
        }
        if self.end_time <= self.start_time {
            return Err(Error::validation("end_time must be after start_time"));
        }
        Ok(())
    }
}

/// Election metadata, scope and lifecycle
///
/// Candidates are not embedded: the election owns the ordered list of
/// candidate ids and the candidate rows live in their own keyed store.
/// Display and tie-break order is the order of `candidate_ids`.
///
/// `is_completed` implies `!is_active`. Use the lifecycle methods below to
/// change the two flags; stores refuse writes that break the implication.
/// `start_time` and `end_time` are informational and never gate casting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Election {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub election_type: ElectionType,
    pub state: String,
    pub district: Option<String>,
    pub constituency: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub is_completed: bool,
    pub candidate_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Election {
    /// Build a fresh, active election with no candidates
    pub fn new(input: NewElection) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            election_type: input.election_type,
            state: input.state,
            district: input.district,
            constituency: input.constituency,
            start_time: input.start_time,
            end_time: input.end_time,
            is_active: true,
            is_completed: false,
            candidate_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Whether the election currently accepts votes
    pub fn is_open(&self) -> bool {
        self.is_active && !self.is_completed
    }

    /// Whether `candidate_id` is listed on this election
    pub fn has_candidate(&self, candidate_id: &Uuid) -> bool {
        self.candidate_ids.contains(candidate_id)
    }

    /// Re-open or suspend the election. Completed elections stay closed.
    pub fn set_active(&mut self, active: bool) -> Result<()> {
        if self.is_completed {
            return Err(Error::ElectionNotOpen {
                election_id: self.id,
            });
        }
        self.is_active = active;
        Ok(())
    }

    /// Close the election for good
    pub fn end(&mut self) {
        self.is_active = false;
        self.is_completed = true;
    }
}

/// A candidate row
///
/// `vote_count` is the denormalized counter maintained alongside the ledger.
/// It must always equal the number of [`Vote`] rows naming this candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: Uuid,
    pub election_id: Uuid,
    pub name: String,
    pub party: String,
    pub vote_count: u64,
}

impl Candidate {
    pub fn new(election_id: Uuid, name: impl Into<String>, party: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            election_id,
            name: name.into(),
            party: party.into(),
            vote_count: 0,
        }
    }
}

/// A cast vote, exactly as written to the ledger
///
/// At most one exists per (`voter_id`, `election_id`). Rows are never
/// updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub vote_id: Uuid,

    /// Raw voter identifier. Never leaves the engine; public views carry the
    /// anonymized handle instead.
    pub voter_id: String,

    pub election_id: Uuid,
    pub candidate_id: Uuid,

    /// Voter's state at casting time, frozen for audit
    pub jurisdiction_state: String,

    pub timestamp: DateTime<Utc>,

    /// Position in the election's hash chain, starting at 1
    pub sequence: u64,

    /// Hex-encoded random nonce mixed into the proof
    pub nonce: String,

    pub previous_proof: Option<Hash>,
    pub proof: Hash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_election(election_type: ElectionType) -> NewElection {
        let now = Utc::now();
        NewElection {
            title: "Test Election".to_string(),
            description: None,
            election_type,
            state: "Delhi".to_string(),
            district: None,
            constituency: None,
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
        }
    }

    #[test]
    fn test_election_lifecycle() {
        let mut election = Election::new(new_election(ElectionType::Local));
        assert!(election.is_open());

        election.set_active(false).unwrap();
        assert!(!election.is_open());

        election.set_active(true).unwrap();
        election.end();
        assert!(election.is_completed);
        assert!(!election.is_active);

        // Completed elections cannot be re-activated
        assert!(matches!(
            election.set_active(true),
            Err(Error::ElectionNotOpen { .. })
        ));
        assert!(!election.is_active);
    }

    #[test]
    fn test_new_election_validation() {
        assert!(new_election(ElectionType::State).validate().is_ok());

        let mut backwards = new_election(ElectionType::State);
        backwards.end_time = backwards.start_time;
        assert!(backwards.validate().is_err());

        let mut untitled = new_election(ElectionType::State);
        untitled.title = "  ".to_string();
        assert!(untitled.validate().is_err());
    }

    #[test]
    fn test_election_type_parsing() {
        assert_eq!("national".parse::<ElectionType>().unwrap(), ElectionType::National);
        assert_eq!("lok-sabha".parse::<ElectionType>().unwrap(), ElectionType::National);
        assert_eq!(
            "state-assembly".parse::<ElectionType>().unwrap(),
            ElectionType::State
        );
        assert_eq!("Municipal".parse::<ElectionType>().unwrap(), ElectionType::Municipal);
        assert!("federal".parse::<ElectionType>().is_err());

        let decoded: ElectionType = serde_json::from_str("\"lok-sabha\"").unwrap();
        assert_eq!(decoded, ElectionType::National);
        assert_eq!(serde_json::to_string(&ElectionType::Local).unwrap(), "\"local\"");
    }
}
