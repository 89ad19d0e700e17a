//! # Directory Value Types
//!
//! Fixed-size identifiers shared by the directory, the HTTP surface and the
//! signature verifier.
//!
//! ## Types
//!
//! | Type | Description | Size | Text form |
//! |------|-------------|------|-----------|
//! | `Address` | Execution-layer account / node address | 20 bytes | EIP-55 checksummed, `0x`-prefixed |
//! | `ValidatorPubkey` | BLS validator public key (opaque) | 48 bytes | lowercase hex, `0x`-prefixed |
//! | `HexBytes` | Opaque byte payload in deposit data | any | lowercase hex, no prefix |
//!
//! ## Parsing
//!
//! All parsers accept an optional `0x` / `0X` prefix and mixed-case hex
//! digits. Nothing in this module panics on malformed input; failures are
//! reported through [`ParseError`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

// ════════════════════════════════════════════════════════════════════════════════
// ERROR TYPE
// ════════════════════════════════════════════════════════════════════════════════

/// Error returned when a hex string cannot be turned into one of the value
/// types of this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Decoded byte length does not match the type.
    InvalidLength {
        /// Number of bytes decoded.
        got: usize,
        /// Number of bytes required.
        expected: usize,
    },

    /// Input contains a non-hex character.
    InvalidHexCharacter {
        /// Offending character.
        character: char,
        /// Position in the input, after the prefix was stripped.
        position: usize,
    },

    /// Odd number of hex digits.
    OddLength,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidLength { got, expected } => {
                write!(f, "invalid length: got {} bytes, expected {}", got, expected)
            }
            ParseError::InvalidHexCharacter {
                character,
                position,
            } => {
                write!(
                    f,
                    "invalid hex character '{}' at position {}",
                    character, position
                )
            }
            ParseError::OddLength => write!(f, "odd number of hex digits"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<hex::FromHexError> for ParseError {
    fn from(err: hex::FromHexError) -> Self {
        match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => ParseError::InvalidHexCharacter {
                character: c,
                position: index,
            },
            hex::FromHexError::OddLength => ParseError::OddLength,
            hex::FromHexError::InvalidStringLength => ParseError::OddLength,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ════════════════════════════════════════════════════════════════════════════════

/// Strips an optional `0x` / `0X` prefix.
#[inline]
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decodes a hex string, with or without `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, ParseError> {
    Ok(hex::decode(strip_hex_prefix(s))?)
}

/// Encodes bytes as lowercase hex with a `0x` prefix.
#[inline]
pub fn encode_hex_with_prefix(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseError> {
    let bytes = decode_hex(s)?;
    if bytes.len() != N {
        return Err(ParseError::InvalidLength {
            got: bytes.len(),
            expected: N,
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

// ════════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ════════════════════════════════════════════════════════════════════════════════

/// 20-byte execution-layer address.
///
/// Displayed and serialized in EIP-55 mixed-case checksum form, which is
/// also the form embedded in signed registration and login messages.
/// Parsing does not enforce the checksum.
///
/// ```rust,ignore
/// let addr: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse()?;
/// assert_eq!(addr.to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// Length in bytes.
    pub const LEN: usize = 20;

    #[must_use]
    #[inline]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Takes the last 20 bytes of `bytes`; shorter input is left-padded
    /// with zeroes.
    pub fn from_slice_right_aligned(bytes: &[u8]) -> Self {
        let mut out = [0u8; 20];
        if bytes.len() >= 20 {
            out.copy_from_slice(&bytes[bytes.len() - 20..]);
        } else {
            out[20 - bytes.len()..].copy_from_slice(bytes);
        }
        Self(out)
    }

    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        decode_fixed::<20>(s).map(Self)
    }

    #[must_use]
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 checksummed representation, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// VALIDATOR PUBKEY
// ════════════════════════════════════════════════════════════════════════════════

/// 48-byte BLS validator public key. Treated as an opaque identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatorPubkey([u8; 48]);

impl ValidatorPubkey {
    pub const LEN: usize = 48;

    #[must_use]
    #[inline]
    pub const fn new(bytes: [u8; 48]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() != Self::LEN {
            return Err(ParseError::InvalidLength {
                got: bytes.len(),
                expected: Self::LEN,
            });
        }
        let mut out = [0u8; 48];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        decode_fixed::<48>(s).map(Self)
    }

    #[must_use]
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }

    pub fn to_hex_with_prefix(&self) -> String {
        encode_hex_with_prefix(&self.0)
    }
}

impl fmt::Debug for ValidatorPubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorPubkey({})", self.to_hex_with_prefix())
    }
}

impl fmt::Display for ValidatorPubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_with_prefix())
    }
}

impl FromStr for ValidatorPubkey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ValidatorPubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_with_prefix())
    }
}

impl<'de> Deserialize<'de> for ValidatorPubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// HEX BYTES
// ════════════════════════════════════════════════════════════════════════════════

/// Variable-length byte payload. Serialized as bare lowercase hex, accepted
/// with or without prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_hex(&s).map(Self).map_err(de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_checksum_matches_eip55_vectors() {
        let vectors = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];
        for expected in vectors {
            let addr = Address::from_hex(&expected.to_lowercase()).expect("parse");
            assert_eq!(addr.to_string(), expected);
        }
    }

    #[test]
    fn address_parse_rejects_wrong_length() {
        let err = Address::from_hex("0x1234").unwrap_err();
        assert_eq!(err, ParseError::InvalidLength { got: 2, expected: 20 });
    }

    #[test]
    fn address_parse_rejects_non_hex() {
        let bad = format!("0x{}", "zz".repeat(20));
        assert!(matches!(
            Address::from_hex(&bad),
            Err(ParseError::InvalidHexCharacter { character: 'z', .. })
        ));
    }

    #[test]
    fn address_from_right_aligned_slice() {
        let mut creds = vec![0x01u8];
        creds.extend_from_slice(&[0u8; 11]);
        creds.extend_from_slice(&[0xab; 20]);
        assert_eq!(Address::from_slice_right_aligned(&creds), Address::new([0xab; 20]));

        let short = Address::from_slice_right_aligned(&[0xff, 0xee]);
        assert_eq!(short.as_bytes()[18..], [0xff, 0xee]);
        assert!(short.as_bytes()[..18].iter().all(|b| *b == 0));
    }

    #[test]
    fn address_json_uses_checksum() {
        let addr = Address::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").expect("parse");
        let json = serde_json::to_string(&addr).expect("serialize");
        assert_eq!(json, "\"0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\"");
        let back: Address = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, addr);
    }

    #[test]
    fn pubkey_hex_roundtrip_with_and_without_prefix() {
        let pk = ValidatorPubkey::new([0x11; 48]);
        let hex_str = pk.to_hex_with_prefix();
        assert!(hex_str.starts_with("0x"));
        assert_eq!(ValidatorPubkey::from_hex(&hex_str).expect("prefixed"), pk);
        assert_eq!(ValidatorPubkey::from_hex(&hex_str[2..]).expect("bare"), pk);
    }

    #[test]
    fn pubkey_rejects_short_input() {
        assert!(matches!(
            ValidatorPubkey::from_slice(&[0u8; 47]),
            Err(ParseError::InvalidLength { got: 47, expected: 48 })
        ));
    }

    #[test]
    fn hex_bytes_serialize_without_prefix() {
        let bytes = HexBytes(vec![0xde, 0xad]);
        assert_eq!(serde_json::to_string(&bytes).expect("serialize"), "\"dead\"");
        let parsed: HexBytes = serde_json::from_str("\"0xDEAD\"").expect("deserialize");
        assert_eq!(parsed, bytes);
    }
}
