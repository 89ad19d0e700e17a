//! Signature Integration Tests
//!
//! Exercises the wallet-signature flow the way a node operator client does:
//! build the canonical message, sign it, hex-encode it, and verify it.

use nsmock_common::crypto::{
    address_from_secret_key, decode_signature, login_message, recover_address,
    registration_message, secret_key_from_bytes, sign_message, verify_login_signature,
    verify_registration_signature,
};
use nsmock_common::{Address, SignatureError};
use rand::RngCore;

// ════════════════════════════════════════════════════════════════════════════════
// HELPERS
// ════════════════════════════════════════════════════════════════════════════════

fn random_key() -> libsecp256k1::SecretKey {
    let mut rng = rand::thread_rng();
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        if let Ok(sk) = secret_key_from_bytes(&bytes) {
            return sk;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// A. ROUND TRIPS
// ════════════════════════════════════════════════════════════════════════════════

/// Signatures from random keys always recover to the signing address.
#[test]
fn test_random_keys_recover_to_signer() {
    for _ in 0..16 {
        let sk = random_key();
        let addr = address_from_secret_key(&sk);
        let msg = registration_message("test@test.com", &addr);
        let sig = sign_message(&sk, msg.as_bytes());
        assert_eq!(recover_address(&sig, msg.as_bytes()).expect("recover"), addr);
    }
}

/// A hex-encoded signature, prefixed or bare, verifies after decoding.
#[test]
fn test_hex_signature_verifies() {
    let sk = random_key();
    let addr = address_from_secret_key(&sk);
    let sig = sign_message(&sk, registration_message("test@test.com", &addr).as_bytes());

    for encoded in [format!("0x{}", hex::encode(sig)), hex::encode(sig)] {
        let decoded = decode_signature(&encoded).expect("decode");
        verify_registration_signature("test@test.com", &addr, &decoded).expect("verify");
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// B. REJECTIONS
// ════════════════════════════════════════════════════════════════════════════════

/// A login signature does not verify as a registration signature.
#[test]
fn test_signature_is_bound_to_message_kind() {
    let sk = random_key();
    let addr = address_from_secret_key(&sk);
    let sig = sign_message(&sk, login_message("0x01", &addr).as_bytes());

    verify_login_signature("0x01", &addr, &sig).expect("login signature");
    assert!(matches!(
        verify_registration_signature("0x01", &addr, &sig),
        Err(SignatureError::AddressMismatch { .. })
    ));
}

/// A different nonce recovers some other address.
#[test]
fn test_login_signature_bound_to_nonce() {
    let sk = random_key();
    let addr = address_from_secret_key(&sk);
    let sig = sign_message(&sk, login_message("0xaaaa", &addr).as_bytes());

    let err = verify_login_signature("0xbbbb", &addr, &sig).unwrap_err();
    match err {
        SignatureError::AddressMismatch { recovered, expected } => {
            assert_eq!(expected, addr);
            assert_ne!(recovered, addr);
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Non-hex signatures are reported, not panicked on.
#[test]
fn test_non_hex_signature_rejected() {
    assert!(matches!(
        decode_signature("0xnothex"),
        Err(SignatureError::Hex(_))
    ));
}

/// Messages embed the checksummed address even when parsed from lowercase.
#[test]
fn test_message_uses_checksummed_address() {
    let addr: Address = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359".parse().expect("parse");
    assert!(registration_message("x@y.z", &addr).contains("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"));
}
