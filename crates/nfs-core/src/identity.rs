//! Fixed-width network names.
//!
//! Every addressable thing on the network (a node, a fob, a chunk) is named by
//! a 64-byte value in the SHA-512 output space. Text form is lowercase hex.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;
use std::str::FromStr;

/// Width of every network name in bytes.
pub const IDENTITY_SIZE: usize = 64;

/// A 64-byte network name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Identity([u8; IDENTITY_SIZE]);

impl Identity {
    /// Name derived by hashing `data`.
    pub fn hash_of(data: &[u8]) -> Self {
        let digest = Sha512::digest(data);
        let mut bytes = [0u8; IDENTITY_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Build from a slice, which must be exactly [`IDENTITY_SIZE`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentityParseError> {
        let bytes: [u8; IDENTITY_SIZE] = bytes
            .try_into()
            .map_err(|_| IdentityParseError::WrongLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    /// Raw bytes of the name.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_SIZE] {
        &self.0
    }

    /// Abbreviated hex form for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}..)", self.short())
    }
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| IdentityParseError::NotHex(s.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl TryFrom<Vec<u8>> for Identity {
    type Error = IdentityParseError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_slice(&bytes)
    }
}

impl From<Identity> for Vec<u8> {
    fn from(id: Identity) -> Self {
        id.0.to_vec()
    }
}

/// Error building an identity from bytes or text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("identity must be {IDENTITY_SIZE} bytes, got {0}")]
    WrongLength(usize),
    #[error("identity must be hex encoded, got: {0}")]
    NotHex(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex() {
        let id = Identity::hash_of(b"chunk");
        let parsed: Identity = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_short_input() {
        let err = "abcd".parse::<Identity>().unwrap_err();
        assert_eq!(err, IdentityParseError::WrongLength(2));
    }

    #[test]
    fn rejects_non_hex() {
        let err = "zz".parse::<Identity>().unwrap_err();
        assert!(matches!(err, IdentityParseError::NotHex(_)));
    }

    #[test]
    fn hash_is_sha512() {
        let id = Identity::hash_of(b"");
        assert!(id.to_string().starts_with("cf83e135"));
    }
}
