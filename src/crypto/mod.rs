//! Cryptographic primitives for the election engine

pub mod anonymize;
pub mod proof;

use crate::{Result, crypto_error};
use rand::RngCore;

pub use crate::types::Hash;

pub use anonymize::{AnonymizedHandle, Anonymizer, HANDLE_PREFIX};
pub use proof::{ProofInput, ProofSealer};

/// Cryptographic utilities
pub struct CryptoUtils;

impl CryptoUtils {
    /// Verify that two hashes are equal in constant time
    pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
        use subtle::ConstantTimeEq;
        if a.len() != b.len() {
            return false;
        }
        a.ct_eq(b).into()
    }

    /// Generate `len` cryptographically secure random bytes
    pub fn random_bytes(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    }

    /// Convert a `0x`-prefixed or bare hex string to a hash
    pub fn hex_to_hash(hex: &str) -> Result<Hash> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.len() != 64 {
            return Err(crypto_error!(
                "Invalid hex length for hash: expected 64, got {}",
                hex.len()
            ));
        }

        let mut hash = [0u8; 32];
        hex::decode_to_slice(hex, &mut hash)
            .map_err(|e| crypto_error!("Invalid hex string: {}", e))?;
        Ok(hash)
    }

    /// Convert a hash to a `0x`-prefixed hex string
    pub fn hash_to_hex(hash: &Hash) -> String {
        format!("0x{}", hex::encode(hash))
    }
}
