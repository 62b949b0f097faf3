//! Configuration for the election engine
//!
//! Loads the anonymization secret and engine tunables from environment
//! variables (optionally through a `.env` file) with validation.

use crate::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Minimum decoded length of the voter secret
const MIN_SECRET_BYTES: usize = 32;

/// Default width of the random nonce mixed into each vote proof
const DEFAULT_PROOF_NONCE_BYTES: usize = 16;

/// Security configuration for anonymization and vote proofs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Secret used to derive anonymized voter handles (base64, minimum 32 bytes)
    pub voter_secret: String,

    /// Number of random bytes mixed into each proof hash
    pub proof_nonce_bytes: usize,
}

impl SecurityConfig {
    /// Load security configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let voter_secret = std::env::var("ELECTION_VOTER_SECRET")
            .map_err(|_| Error::internal("ELECTION_VOTER_SECRET environment variable required"))?;

        Self::validate_secret(&voter_secret, "ELECTION_VOTER_SECRET")?;

        let proof_nonce_bytes = std::env::var("ELECTION_PROOF_NONCE_BYTES")
            .unwrap_or_else(|_| DEFAULT_PROOF_NONCE_BYTES.to_string())
            .parse()
            .map_err(|_| Error::internal("Invalid ELECTION_PROOF_NONCE_BYTES"))?;

        let config = Self {
            voter_secret,
            proof_nonce_bytes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration for testing
    pub fn for_testing() -> Result<Self> {
        let voter_secret =
            base64::engine::general_purpose::STANDARD.encode(rand::random::<[u8; 32]>());

        Ok(Self {
            voter_secret,
            proof_nonce_bytes: DEFAULT_PROOF_NONCE_BYTES,
        })
    }

    /// Check ranges that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if !(8..=64).contains(&self.proof_nonce_bytes) {
            return Err(Error::validation(
                "proof_nonce_bytes must be between 8 and 64",
            ));
        }
        Ok(())
    }

    /// Validate a base64-encoded secret
    fn validate_secret(secret: &str, name: &str) -> Result<()> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(secret)
            .map_err(|_| Error::internal(format!("{name} must be valid base64")))?;

        if decoded.len() < MIN_SECRET_BYTES {
            return Err(Error::internal(format!(
                "{name} must be at least {MIN_SECRET_BYTES} bytes when decoded"
            )));
        }

        Ok(())
    }

    /// Get the voter secret as bytes
    pub fn voter_secret_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.voter_secret)
            .map(Zeroizing::new)
            .map_err(|_| Error::internal("Invalid voter secret"))
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        let security = SecurityConfig::from_env()?;

        let logging = LoggingConfig {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        };

        Ok(Self { security, logging })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Result<Self> {
        let security = SecurityConfig::for_testing()?;

        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };

        Ok(Self { security, logging })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_config_defaults() {
        let config = SecurityConfig::for_testing().unwrap();

        assert!(config.voter_secret_bytes().unwrap().len() >= MIN_SECRET_BYTES);
        assert_eq!(config.proof_nonce_bytes, DEFAULT_PROOF_NONCE_BYTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secret_validation() {
        let valid = base64::engine::general_purpose::STANDARD.encode([0u8; 32]);
        assert!(SecurityConfig::validate_secret(&valid, "TEST").is_ok());

        let short = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        assert!(SecurityConfig::validate_secret(&short, "TEST").is_err());

        assert!(SecurityConfig::validate_secret("invalid_base64!", "TEST").is_err());
    }

    #[test]
    fn test_nonce_width_bounds() {
        let mut config = SecurityConfig::for_testing().unwrap();

        config.proof_nonce_bytes = 4;
        assert!(config.validate().is_err());

        config.proof_nonce_bytes = 65;
        assert!(config.validate().is_err());

        config.proof_nonce_bytes = 32;
        assert!(config.validate().is_ok());
    }
}
