//! Anonymized voter handles
//!
//! A handle is a keyed BLAKE3 digest of the raw voter identifier under a
//! process-wide secret. It is deterministic, so a voter can find their own
//! vote again, and cannot be inverted or recomputed without the secret.
//! Rotating the secret means previously published handles can no longer be
//! re-derived.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::config::SecurityConfig;
use crate::crypto::CryptoUtils;
use crate::{Result, crypto_error};

/// Prefix on every rendered handle
pub const HANDLE_PREFIX: &str = "0x";

/// Minimum secret length in bytes
const MIN_SECRET_BYTES: usize = 32;

/// Context string for deriving the BLAKE3 key from the secret
const KEY_CONTEXT: &str = "election-core 2026 anonymized voter handle";

/// Public stand-in for a raw voter identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnonymizedHandle(String);

impl AnonymizedHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a handle presented by a caller
    pub fn matches(&self, other: &str) -> bool {
        CryptoUtils::constant_time_eq(self.0.as_bytes(), other.as_bytes())
    }
}

impl fmt::Display for AnonymizedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives anonymized handles from raw identifiers
#[derive(Clone)]
pub struct Anonymizer {
    key: Zeroizing<[u8; 32]>,
}

impl fmt::Debug for Anonymizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anonymizer").finish_non_exhaustive()
    }
}

impl Anonymizer {
    /// Build from a raw secret of at least 32 bytes
    pub fn new(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(crypto_error!(
                "Voter secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                secret.len()
            ));
        }

        Ok(Self {
            key: Zeroizing::new(blake3::derive_key(KEY_CONTEXT, secret)),
        })
    }

    /// Build from the configured secret
    pub fn from_config(config: &SecurityConfig) -> Result<Self> {
        let secret = config.voter_secret_bytes()?;
        Self::new(&secret)
    }

    /// Create for testing with a random secret
    pub fn for_testing() -> Self {
        Self {
            key: Zeroizing::new(rand::random()),
        }
    }

    /// Anonymize a raw voter identifier
    pub fn anonymize(&self, voter_id: &str) -> AnonymizedHandle {
        let digest = blake3::keyed_hash(&self.key, voter_id.as_bytes());
        AnonymizedHandle(format!("{HANDLE_PREFIX}{}", hex::encode(digest.as_bytes())))
    }
}
