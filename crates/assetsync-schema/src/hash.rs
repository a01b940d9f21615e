use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ManifestError;

/// Digest algorithms used to identify asset content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 20-byte SHA-1 digest.
    Sha1,
    /// 16-byte MD5 digest.
    Md5,
}

impl HashAlgorithm {
    /// Length in bytes of a digest produced by this algorithm.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Md5 => 16,
        }
    }
}

/// Raw digest bytes identifying a piece of content independent of its name.
///
/// Serialized as a lowercase hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ContentHash(Vec<u8>);

impl ContentHash {
    /// Wrap raw digest bytes without validating their length.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Wrap raw digest bytes, checking them against the declared algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Format`] if the length does not match
    /// [`HashAlgorithm::digest_len`].
    pub fn validated(bytes: impl Into<Vec<u8>>, algorithm: HashAlgorithm) -> Result<Self, ManifestError> {
        let bytes = bytes.into();
        if bytes.len() != algorithm.digest_len() {
            return Err(ManifestError::format(format!(
                "{algorithm:?} digest must be {} bytes, got {}",
                algorithm.digest_len(),
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Decode a hex string into a hash.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Format`] if `s` is not valid hex.
    pub fn from_hex(s: &str) -> Result<Self, ManifestError> {
        decode_hex(s).map(Self)
    }

    /// Lowercase hex rendering of the digest.
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of digest bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the digest carries no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ContentHash {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Lowercase hex encoding of `bytes`.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string (either case) into bytes.
///
/// # Errors
///
/// Returns [`ManifestError::Format`] for odd-length input or non-hex characters.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, ManifestError> {
    hex::decode(s).map_err(|e| ManifestError::format(format!("invalid hex '{s}': {e}")))
}

/// Recover the canonical hex hash from a decimal-encoded 64-bit identity.
///
/// Some manifests store an 8-byte big-endian hash as the decimal rendering of
/// the integer a little-endian reader produced from it. This parses the
/// decimal string as `u64`, takes its little-endian bytes, reverses them and
/// hex-encodes the result (16 lowercase hex digits).
///
/// Input that does not parse as `u64` is returned unchanged.
pub fn normalize_numeric_hash(s: &str) -> String {
    let Ok(value) = s.parse::<u64>() else {
        return s.to_string();
    };
    let mut bytes = value.to_le_bytes();
    bytes.reverse();
    encode_hex(&bytes)
}
