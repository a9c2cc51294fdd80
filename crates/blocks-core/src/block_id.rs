//! Block identifiers
//!
//! A `BlockId` is an opaque token that names one block within a document.
//! Fresh ids are 16 random bytes (a UUID v4) rendered in base58, which keeps
//! them short enough to type while making collisions negligible at the scale
//! of a single in-memory document. No collision check is performed.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from parsing a block id
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockIdError {
    #[error("Block id is empty")]
    Empty,

    #[error("Invalid block id '{0}': not base58")]
    InvalidEncoding(String),
}

/// Identifier of a block in the store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generate a new random id
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4();
        Self(bs58::encode(uuid.as_bytes()).into_string())
    }

    /// Parse an id from its string form
    pub fn parse(s: &str) -> Result<Self, BlockIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BlockIdError::Empty);
        }
        bs58::decode(s)
            .into_vec()
            .map_err(|_| BlockIdError::InvalidEncoding(s.to_string()))?;
        Ok(Self(s.to_string()))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters, for compact display
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BlockId {
    type Err = BlockIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_is_base58() {
        let id = BlockId::generate();
        assert!(!id.as_str().is_empty());
        assert!(bs58::decode(id.as_str()).into_vec().is_ok());
        assert_eq!(bs58::decode(id.as_str()).into_vec().unwrap().len(), 16);
    }

    #[test]
    fn test_generate_unique() {
        let ids: HashSet<BlockId> = (0..1000).map(|_| BlockId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = BlockId::generate();
        let parsed: BlockId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!(BlockId::parse("   "), Err(BlockIdError::Empty));
        // 0, O, I and l are not in the base58 alphabet
        assert!(matches!(
            BlockId::parse("0OIl"),
            Err(BlockIdError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_short() {
        let id = BlockId::parse("abcdefgh").unwrap();
        assert_eq!(id.short(4), "abcd");
        assert_eq!(id.short(20), "abcdefgh");
    }

    #[test]
    fn test_serialization_is_plain_string() {
        let id = BlockId::parse("abc").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
