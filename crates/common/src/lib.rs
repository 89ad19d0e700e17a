//! # NodeSet Mock Common Crate
//!
//! Types and helpers shared between the directory service and its clients.
//!
//! ## Modules
//! - `types`: `Address` (EIP-55), `ValidatorPubkey`, `HexBytes`, hex helpers
//! - `deposit`: deposit data and signed exit payloads
//! - `api`: response envelope, request/response bodies, route constants
//! - `crypto`: EIP-191 hashing, secp256k1 recovery, canonical signed messages
//!
//! ## Signing Flow
//! ```text
//! message ──► "\x19Ethereum Signed Message:\n" + len + message
//!                              │
//!                          keccak256
//!                              │
//!            signature ──► ecrecover ──► public key ──► address
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let msg = registration_message("user@example.com", &node);
//! let sig = sign_message(&secret_key, msg.as_bytes());
//! verify_registration_signature("user@example.com", &node, &sig)?;
//! ```

pub mod api;
pub mod crypto;
pub mod deposit;
pub mod types;

pub use api::{
    bearer_header_value, DepositDataData, DepositDataMetaData, LoginData, LoginRequest,
    NodeSetResponse, NonceData, RegisterNodeRequest, StakeWiseStatus, ValidatorStatus,
    ValidatorsData,
};
pub use crypto::SignatureError;
pub use deposit::{ExitData, ExitMessage, ExitMessageDetails, ExtendedDepositData};
pub use types::{Address, HexBytes, ParseError, ValidatorPubkey};
