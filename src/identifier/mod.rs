//! Voter identifier codec
//!
//! A voter identifier is 17 ASCII characters:
//!
//! ```text
//! VC  RJ  06  23  26  K3M9QZ  7
//! |   |   |   |   |   |       checksum digit
//! |   |   |   |   |   random part (A-Z, 0-9)
//! |   |   |   |   year suffix
//! |   |   |   constituency code
//! |   |   district code
//! |   state code
//! fixed prefix
//! ```
//!
//! [`IdentifierCodec::decode`] only checks the shape (length and prefix) and
//! never the checksum, so identifiers minted before a code-table change keep
//! decoding. Checksum verification happens at input boundaries through
//! [`VoterIdentifier::parse`] or [`verify_checksum`].

pub mod codes;

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::Jurisdiction;
use crate::{Error, Result};

pub use codes::{
    CodeTable, UNKNOWN_AREA_CODE, UNKNOWN_CONSTITUENCY, UNKNOWN_DISTRICT, UNKNOWN_STATE,
    UNKNOWN_STATE_CODE,
};

/// Fixed marker every identifier starts with
pub const IDENTIFIER_PREFIX: &str = "VC";

/// Total identifier length, checksum included
pub const IDENTIFIER_LEN: usize = 17;

/// Length of the random part
pub const RANDOM_PART_LEN: usize = 6;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Positional value used by the checksum: 'A'..'Z' map to 1..26, '0'..'9'
/// to 27..36 and anything else to 0.
fn char_value(c: u8) -> u32 {
    match c {
        b'A'..=b'Z' => u32::from(c - b'A') + 1,
        b'0'..=b'9' => u32::from(c - b'0') + 27,
        _ => 0,
    }
}

/// Checksum digit over the first 16 characters of an identifier.
///
/// This is a transcription guard, not a cryptographic check; collisions are
/// expected.
pub fn calculate_checksum(body: &str) -> char {
    let sum: u32 = body.bytes().map(char_value).sum();
    char::from(b'0' + (sum % 10) as u8)
}

/// Whether the last character of `identifier` matches the checksum of the
/// rest. Malformed input is simply not valid.
pub fn verify_checksum(identifier: &str) -> bool {
    if identifier.len() != IDENTIFIER_LEN || !identifier.is_ascii() {
        return false;
    }
    let (body, check) = identifier.split_at(IDENTIFIER_LEN - 1);
    check.chars().next() == Some(calculate_checksum(body))
}

fn check_shape(identifier: &str) -> Result<()> {
    if !identifier.is_ascii() {
        return Err(Error::invalid_format("identifier must be ASCII"));
    }
    if identifier.len() != IDENTIFIER_LEN {
        return Err(Error::invalid_format(format!(
            "expected {IDENTIFIER_LEN} characters, got {}",
            identifier.len()
        )));
    }
    if !identifier.starts_with(IDENTIFIER_PREFIX) {
        return Err(Error::invalid_format(format!(
            "identifier must start with {IDENTIFIER_PREFIX}"
        )));
    }
    Ok(())
}

/// A fully validated voter identifier (shape, alphabet and checksum)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterIdentifier(String);

impl VoterIdentifier {
    /// Strict validation used at input boundaries such as login
    pub fn parse(identifier: &str) -> Result<Self> {
        check_shape(identifier)?;
        if !identifier
            .bytes()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(Error::invalid_format(
                "identifier may only contain A-Z and 0-9",
            ));
        }
        if !verify_checksum(identifier) {
            return Err(Error::invalid_format("checksum mismatch"));
        }
        Ok(Self(identifier.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VoterIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VoterIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VoterIdentifier {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VoterIdentifier> for String {
    fn from(value: VoterIdentifier) -> Self {
        value.0
    }
}

/// Fields extracted from an identifier
///
/// Names that the code table cannot resolve decode to the `UNKNOWN_*`
/// sentinels instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedIdentifier {
    pub state: String,
    pub district: String,
    pub constituency: String,
    pub state_code: String,
    pub district_code: String,
    pub constituency_code: String,
    pub year: String,
    pub random_part: String,
    pub checksum: char,
}

impl DecodedIdentifier {
    pub fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction {
            state: self.state.clone(),
            district: self.district.clone(),
            constituency: self.constituency.clone(),
        }
    }

    /// Whether the state code resolved to a known name
    pub fn has_known_state(&self) -> bool {
        self.state != UNKNOWN_STATE
    }
}

/// Encoder/decoder bound to a code table
#[derive(Debug, Clone)]
pub struct IdentifierCodec {
    table: CodeTable,
}

impl Default for IdentifierCodec {
    fn default() -> Self {
        Self::new(CodeTable::builtin())
    }
}

impl IdentifierCodec {
    pub fn new(table: CodeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    /// Mint a new identifier for a verified jurisdiction, stamped with the
    /// current year.
    pub fn encode(&self, state: &str, district: &str, constituency: &str) -> VoterIdentifier {
        self.encode_with(
            state,
            district,
            constituency,
            Utc::now().year(),
            &mut rand::thread_rng(),
        )
    }

    /// Mint an identifier with an explicit year and random source
    pub fn encode_with<R: Rng + ?Sized>(
        &self,
        state: &str,
        district: &str,
        constituency: &str,
        year: i32,
        rng: &mut R,
    ) -> VoterIdentifier {
        let mut body = String::with_capacity(IDENTIFIER_LEN);
        body.push_str(IDENTIFIER_PREFIX);
        body.push_str(self.table.state_code(state));
        body.push_str(self.table.district_code(state, district));
        body.push_str(self.table.constituency_code(district, constituency));
        body.push_str(&format!("{:02}", year.rem_euclid(100)));
        for _ in 0..RANDOM_PART_LEN {
            body.push(char::from(ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())]));
        }

        let checksum = calculate_checksum(&body);
        body.push(checksum);
        VoterIdentifier(body)
    }

    /// Split an identifier into its fields and resolve the codes to names.
    ///
    /// Fails only when the identifier is not 17 ASCII characters starting with
    /// the prefix. The checksum is not verified.
    pub fn decode(&self, identifier: &str) -> Result<DecodedIdentifier> {
        check_shape(identifier)?;

        let state_code = &identifier[2..4];
        let district_code = &identifier[4..6];
        let constituency_code = &identifier[6..8];
        let year = &identifier[8..10];
        let random_part = &identifier[10..16];
        let checksum = char::from(identifier.as_bytes()[16]);

        let state = self.table.state_name(state_code).unwrap_or(UNKNOWN_STATE);
        let district = self
            .table
            .district_name(state, district_code)
            .unwrap_or(UNKNOWN_DISTRICT);
        let constituency = self
            .table
            .constituency_name(district, constituency_code)
            .unwrap_or(UNKNOWN_CONSTITUENCY);

        Ok(DecodedIdentifier {
            state: state.to_string(),
            district: district.to_string(),
            constituency: constituency.to_string(),
            state_code: state_code.to_string(),
            district_code: district_code.to_string(),
            constituency_code: constituency_code.to_string(),
            year: year.to_string(),
            random_part: random_part.to_string(),
            checksum,
        })
    }
}
