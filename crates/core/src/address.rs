//! 20-byte account addresses.

use crate::hash::HexError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named alias for the raw 20-byte address form.
pub type AddressBytes = [u8; 20];

/// An account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub AddressBytes);

/// Length of the hex form: "0x" followed by 40 digits.
const ADDRESS_HEX_LEN: usize = 42;

impl Address {
    /// The zero address (all zeros), reserved for system use.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: AddressBytes) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &AddressBytes {
        &self.0
    }

    /// Convert to a hex string with the `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from a hex string.
    ///
    /// The input must carry the `0x` prefix and be exactly 42 characters;
    /// anything else is rejected.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let digits = s.strip_prefix("0x").ok_or(HexError::MissingPrefix)?;
        if s.len() != ADDRESS_HEX_LEN {
            return Err(HexError::InvalidLength {
                expected: ADDRESS_HEX_LEN,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(digits).map_err(|_| HexError::InvalidDigit)?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<AddressBytes> for Address {
    fn from(bytes: AddressBytes) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
