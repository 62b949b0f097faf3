//! Vote proofs
//!
//! Every ledger entry carries a SHA-256 commitment over what was cast, a
//! random nonce and the proof of the previous vote in the same election.
//! The nonce makes proofs unpredictable and distinct even for identical
//! inputs; the previous-proof link makes each election's ledger a hash
//! chain, so rewriting or dropping an earlier row breaks every later proof.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::crypto::CryptoUtils;
use crate::types::{Hash, Vote};
use crate::{Result, crypto_error};

/// Everything a proof commits to
#[derive(Debug, Clone, Serialize)]
pub struct ProofInput<'a> {
    pub voter_id: &'a str,
    pub election_id: Uuid,
    pub candidate_id: Uuid,
    pub sequence: u64,
    pub nonce: &'a str,
    pub timestamp: DateTime<Utc>,
    pub previous_proof: Option<String>,
}

impl<'a> ProofInput<'a> {
    /// The input a stored vote was sealed with
    pub fn from_vote(vote: &'a Vote) -> Self {
        Self {
            voter_id: &vote.voter_id,
            election_id: vote.election_id,
            candidate_id: vote.candidate_id,
            sequence: vote.sequence,
            nonce: &vote.nonce,
            timestamp: vote.timestamp,
            previous_proof: vote.previous_proof.as_ref().map(hex::encode),
        }
    }
}

/// Produces nonces and seals votes
#[derive(Debug, Clone)]
pub struct ProofSealer {
    nonce_bytes: usize,
}

impl Default for ProofSealer {
    fn default() -> Self {
        Self { nonce_bytes: 16 }
    }
}

impl ProofSealer {
    pub fn new(nonce_bytes: usize) -> Self {
        Self { nonce_bytes }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.proof_nonce_bytes)
    }

    /// Fresh hex-encoded random nonce
    pub fn nonce(&self) -> String {
        hex::encode(CryptoUtils::random_bytes(self.nonce_bytes))
    }

    /// Compute the proof hash for `input`
    pub fn seal(&self, input: &ProofInput<'_>) -> Result<Hash> {
        let preimage = serde_json::to_vec(input)
            .map_err(|e| crypto_error!("Failed to serialize proof input: {}", e))?;
        Ok(Sha256::digest(&preimage).into())
    }

    /// Recompute a stored vote's proof and compare it in constant time
    pub fn verify(&self, vote: &Vote) -> Result<bool> {
        let expected = self.seal(&ProofInput::from_vote(vote))?;
        Ok(CryptoUtils::constant_time_eq(&expected, &vote.proof))
    }
}
