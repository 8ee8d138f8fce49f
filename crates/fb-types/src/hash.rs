//! The 64-hex block identity.

use crate::errors::BlockError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A block identity: SHA-256 of the canonical form, 64 lowercase hex chars.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hash(String);

impl Hash {
    /// Validate and wrap a hash string.
    pub fn new(value: impl Into<String>) -> Result<Self, BlockError> {
        let value = value.into();
        if value.len() != 64
            || !value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(BlockError::InvalidHash(value));
        }
        Ok(Self(value))
    }

    /// The raw hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl TryFrom<String> for Hash {
    type Error = BlockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl FromStr for Hash {
    type Err = BlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_hash() {
        let h = Hash::new("a".repeat(64)).unwrap();
        assert_eq!(h.as_str().len(), 64);
        assert_eq!(h.short(), "aaaaaaaa");
    }

    #[test]
    fn test_rejects_uppercase() {
        assert!(Hash::new("A".repeat(64)).is_err());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(Hash::new("abc").is_err());
        assert!(Hash::new("a".repeat(65)).is_err());
    }

    #[test]
    fn test_rejects_non_hex() {
        assert!(Hash::new("g".repeat(64)).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let h = Hash::new("0f".repeat(32)).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result: Result<Hash, _> = serde_json::from_str("\"nope\"");
        assert!(result.is_err());
    }
}
