use std::fmt;

use serde::{Deserialize, Serialize};

/// BLAKE3 content identity.
///
/// Derived from what a record says, never from its label or position, so
/// two option sets that differ only by ordering or naming produce the same
/// set of hashes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute the BLAKE3 hash of arbitrary data.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hex-encode for display.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse from hex string.
    pub fn from_hex(hex: &str) -> Result<Self, ContentHashError> {
        if hex.len() != 64 {
            return Err(ContentHashError::InvalidLength(hex.len()));
        }
        if !hex.is_ascii() {
            return Err(ContentHashError::InvalidHex);
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| ContentHashError::InvalidHex)?;
        }
        Ok(Self(bytes))
    }

    /// Short prefix used in logs and witnesses.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ContentHash::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentHashError {
    #[error("invalid hex length: {0} (expected 64)")]
    InvalidLength(usize),
    #[error("invalid hex character")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let h = ContentHash::hash(b"option content");
        let parsed = ContentHash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(
            ContentHash::from_hex("abc"),
            Err(ContentHashError::InvalidLength(3))
        ));
        let bad = "zz".repeat(32);
        assert!(matches!(
            ContentHash::from_hex(&bad),
            Err(ContentHashError::InvalidHex)
        ));
    }

    #[test]
    fn display_is_short_prefix() {
        let h = ContentHash::hash(b"x");
        assert_eq!(h.to_string().len(), 12);
        assert!(h.to_hex().starts_with(&h.to_string()));
    }
}
