//! Election Vote Engine
//!
//! Casting and tallying core: jurisdiction-coded voter identifiers,
//! anonymized voter handles, eligibility, an append-only vote ledger with
//! one vote per (voter, election), and tallies recomputed from that ledger.

pub mod config;
pub mod crypto;
pub mod eligibility;
pub mod errors;
pub mod identifier;
pub mod ledger;
pub mod tally;
pub mod types;

// Re-export commonly used types
pub use errors::{Error, Result};
pub use identifier::{DecodedIdentifier, IdentifierCodec, VoterIdentifier};
pub use ledger::{ElectionRegistry, LedgerStore, MemoryStore, VoteLedger, VoteProof, VoteReceipt};
pub use tally::{RankedResults, TallyEngine, TimeSeries};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the election engine with proper logging
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "election_core=info".into()),
        )
        .try_init()
        .map_err(|e| Error::internal(format!("Failed to install subscriber: {e}")))?;

    tracing::info!("🗳️  Election engine v{} initialized", VERSION);
    Ok(())
}
