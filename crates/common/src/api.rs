//! # NodeSet API Wire Types
//!
//! Request bodies, response payloads, the common response envelope and the
//! route table of the NodeSet directory API.
//!
//! ## Envelope
//!
//! Every response, success or failure, has the same shape:
//!
//! ```text
//! { "ok": bool, "message": "...", "data": {...}, "error": "<key>" }
//! ```
//!
//! Empty `message`, absent `data` and empty `error` are omitted.
//!
//! ## Routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | `/api/nonce` | GET | - |
//! | `/api/login` | POST | Bearer (nonce session) |
//! | `/api/node-address` | POST | - |
//! | `/api/deposit-data` | GET, POST | Bearer (logged in) |
//! | `/api/deposit-data/meta` | GET | Bearer (logged in) |
//! | `/api/validators` | GET, PATCH | Bearer (logged in) |
//!
//! The same routes are served under `/api/dev/`. Admin routes live under
//! `/admin/` and take query parameters only.

use serde::{Deserialize, Serialize};

use crate::deposit::ExtendedDepositData;
use crate::types::ValidatorPubkey;

// ════════════════════════════════════════════════════════════════════════════════
// ROUTES
// ════════════════════════════════════════════════════════════════════════════════

pub mod routes {
    pub const API_PREFIX: &str = "/api";
    pub const DEV_PREFIX: &str = "/api/dev";
    pub const ADMIN_PREFIX: &str = "/admin";

    pub const NONCE: &str = "nonce";
    pub const LOGIN: &str = "login";
    pub const NODE_ADDRESS: &str = "node-address";
    pub const DEPOSIT_DATA: &str = "deposit-data";
    pub const DEPOSIT_DATA_META: &str = "deposit-data/meta";
    pub const VALIDATORS: &str = "validators";

    pub const ADMIN_ADD_USER: &str = "add-user";
    pub const ADMIN_WHITELIST_NODE: &str = "whitelist-node";
    pub const ADMIN_ADD_VAULT: &str = "add-vault";
    pub const ADMIN_SNAPSHOT: &str = "snapshot";
    pub const ADMIN_REVERT: &str = "revert";
    pub const ADMIN_CYCLE_SET: &str = "cycle-set";
}

/// Name of the header that carries the session token.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Scheme expected in [`AUTHORIZATION_HEADER`].
pub const BEARER_SCHEME: &str = "Bearer";

/// Formats a token as an `Authorization` header value.
pub fn bearer_header_value(token: &str) -> String {
    format!("{} {}", BEARER_SCHEME, token)
}

// ════════════════════════════════════════════════════════════════════════════════
// ENVELOPE
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSetResponse<T> {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl<T> NodeSetResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            message: String::new(),
            data: Some(data),
            error: String::new(),
        }
    }

    pub fn success_message(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: None,
            error: String::new(),
        }
    }

    pub fn failure(error_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            data: None,
            error: error_key.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// REQUESTS
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST node-address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNodeRequest {
    pub email: String,
    pub node_address: String,
    /// Hex-encoded 65-byte signature over the registration message.
    pub signature: String,
}

/// Body of `POST login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub nonce: String,
    pub address: String,
    /// Hex-encoded 65-byte signature over the login message.
    pub signature: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// RESPONSE DATA
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceData {
    pub nonce: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositDataMetaData {
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositDataData {
    pub version: u64,
    #[serde(rename = "depositData")]
    pub deposit_data: Vec<ExtendedDepositData>,
}

/// Validator status vocabulary reported by `GET validators`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StakeWiseStatus {
    /// Not known to the directory on the requested network.
    Unknown,
    /// Uploaded to the directory, not yet handed to a vault.
    Pending,
    /// Handed to a vault.
    Uploaded,
    /// Handed to a vault and confirmed active.
    Registered,
    /// Exited and removed. Never produced by this service.
    Removed,
}

impl StakeWiseStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StakeWiseStatus::Unknown => "UNKNOWN",
            StakeWiseStatus::Pending => "PENDING",
            StakeWiseStatus::Uploaded => "UPLOADED",
            StakeWiseStatus::Registered => "REGISTERED",
            StakeWiseStatus::Removed => "REMOVED",
        }
    }
}

impl std::fmt::Display for StakeWiseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStatus {
    pub pubkey: ValidatorPubkey,
    pub status: StakeWiseStatus,
    #[serde(rename = "exitMessage")]
    pub exit_message_uploaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorsData {
    pub validators: Vec<ValidatorStatus>,
}
