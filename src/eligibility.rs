//! Election eligibility
//!
//! Pure decisions over a voter's decoded jurisdiction. Nothing here is
//! cached: a voter's jurisdiction can be corrected after registration, so
//! callers re-evaluate on every listing.

use crate::types::{Election, ElectionType, Jurisdiction};

/// Whether a voter from `jurisdiction` may take part in `election`.
///
/// National elections are open to everyone; state and local elections to
/// voters of the same state. Every other scope fails closed.
pub fn is_eligible(jurisdiction: &Jurisdiction, election: &Election) -> bool {
    match election.election_type {
        ElectionType::National => true,
        ElectionType::State | ElectionType::Local => jurisdiction.state == election.state,
        ElectionType::Municipal => false,
    }
}

/// The subset of `elections` a voter from `jurisdiction` may take part in,
/// in their original order
pub fn eligible_elections<'a, I>(jurisdiction: &Jurisdiction, elections: I) -> Vec<&'a Election>
where
    I: IntoIterator<Item = &'a Election>,
{
    elections
        .into_iter()
        .filter(|election| is_eligible(jurisdiction, election))
        .collect()
}
