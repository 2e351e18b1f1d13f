//! SHA-256 hashing and hex encoding utilities.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Errors produced when decoding hex-encoded identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    #[error("hex string should start with '0x'")]
    MissingPrefix,

    #[error("hex string should be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("not a hex number")]
    InvalidDigit,
}

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit hash.
pub type H256 = [u8; 32];

/// A wrapper type for H256 with Display and Debug formatting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

/// Length of the hex form: "0x" followed by 64 digits.
const HASH_HEX_LEN: usize = 66;

impl Hash {
    /// The zero hash (all zeros).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a new Hash from raw bytes.
    pub fn from_bytes(bytes: H256) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a hex string with the `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from a hex string.
    ///
    /// The input must carry the `0x` prefix and be exactly 66 characters;
    /// anything else is rejected.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let digits = s.strip_prefix("0x").ok_or(HexError::MissingPrefix)?;
        if s.len() != HASH_HEX_LEN {
            return Err(HexError::InvalidLength {
                expected: HASH_HEX_LEN,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(digits).map_err(|_| HexError::InvalidDigit)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..10])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash arbitrary data using SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// Render an integer as lower-case base-16 ASCII, signed, with no
/// prefix and no padding (`0` → `"0"`, `255` → `"ff"`, `-1` → `"-1"`).
///
/// This is the wire form used inside transaction and proof-of-work
/// digests. Rust's `{:x}` prints negatives in two's complement, so the
/// sign is handled explicitly here.
pub fn int_to_hex(n: i64) -> Vec<u8> {
    let s = if n < 0 {
        format!("-{:x}", (n as i128).unsigned_abs())
    } else {
        format!("{:x}", n)
    };
    s.into_bytes()
}
