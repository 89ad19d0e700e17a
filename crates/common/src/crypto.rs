//! Wallet signature helpers: EIP-191 personal-message hashing, secp256k1
//! public key recovery, and the canonical registration / login messages.
//!
//! Signature format (65 bytes):
//!   [0..32]  = r
//!   [32..64] = s
//!   [64]     = v (27/28, or 0/1)

use libsecp256k1::{Message, PublicKey, RecoveryId, SecretKey, Signature};
use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::types::{decode_hex, Address, ParseError};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature length: expected {expected}, found {found}")]
    InvalidLength { expected: usize, found: usize },

    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("malformed signature")]
    Malformed,

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("signature was produced by {recovered}, expected {expected}")]
    AddressMismatch { recovered: Address, expected: Address },

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("hex decode error: {0}")]
    Hex(#[from] ParseError),
}

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// EIP-191 personal-message hash of `message`.
pub fn text_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Address of an uncompressed public key: last 20 bytes of the Keccak-256
/// digest of the 64-byte `x || y` encoding.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let serialized = public_key.serialize();
    let hash = keccak256(&serialized[1..]);
    Address::from_slice_right_aligned(&hash[12..])
}

pub fn address_from_secret_key(secret_key: &SecretKey) -> Address {
    address_from_public_key(&PublicKey::from_secret_key(secret_key))
}

pub fn secret_key_from_bytes(bytes: &[u8]) -> Result<SecretKey, SignatureError> {
    SecretKey::parse_slice(bytes).map_err(|_| SignatureError::InvalidSecretKey)
}

/// Recovers the signing address of `signature` over the personal-message
/// hash of `message`.
pub fn recover_address(signature: &[u8], message: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(SignatureError::InvalidLength {
            expected: SIGNATURE_LEN,
            found: signature.len(),
        });
    }

    let v = signature[64];
    let recovery = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(SignatureError::InvalidRecoveryId(other)),
    };
    let recovery_id =
        RecoveryId::parse(recovery).map_err(|_| SignatureError::InvalidRecoveryId(v))?;
    let sig = Signature::parse_standard_slice(&signature[..64])
        .map_err(|_| SignatureError::Malformed)?;

    let msg = Message::parse(&text_hash(message));
    let public_key = libsecp256k1::recover(&msg, &sig, &recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(address_from_public_key(&public_key))
}

/// Signs the personal-message hash of `message`. `v` is returned in 27/28
/// form.
pub fn sign_message(secret_key: &SecretKey, message: &[u8]) -> [u8; SIGNATURE_LEN] {
    let msg = Message::parse(&text_hash(message));
    let (sig, recovery_id) = libsecp256k1::sign(&msg, secret_key);

    let mut out = [0u8; SIGNATURE_LEN];
    out[..64].copy_from_slice(&sig.serialize());
    out[64] = recovery_id.serialize() + 27;
    out
}

/// Decodes a hex signature (with or without `0x`).
pub fn decode_signature(hex_sig: &str) -> Result<Vec<u8>, SignatureError> {
    Ok(decode_hex(hex_sig)?)
}

/// Message a node signs to register itself under an account.
pub fn registration_message(email: &str, node_address: &Address) -> String {
    format!(r#"{{"email":"{}","node_address":"{}"}}"#, email, node_address)
}

/// Message a node signs to log in with a nonce.
pub fn login_message(nonce: &str, address: &Address) -> String {
    format!(r#"{{"nonce":"{}","address":"{}"}}"#, nonce, address)
}

fn verify_signer(
    signature: &[u8],
    message: &str,
    expected: &Address,
) -> Result<(), SignatureError> {
    let recovered = recover_address(signature, message.as_bytes())?;
    if recovered != *expected {
        return Err(SignatureError::AddressMismatch {
            recovered,
            expected: *expected,
        });
    }
    Ok(())
}

/// Checks that `signature` is the node's signature over its registration
/// message.
pub fn verify_registration_signature(
    email: &str,
    node_address: &Address,
    signature: &[u8],
) -> Result<(), SignatureError> {
    verify_signer(signature, &registration_message(email, node_address), node_address)
}

/// Checks that `signature` is the node's signature over its login message.
pub fn verify_login_signature(
    nonce: &str,
    address: &Address,
    signature: &[u8],
) -> Result<(), SignatureError> {
    verify_signer(signature, &login_message(nonce, address), address)
}
