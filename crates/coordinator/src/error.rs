//! Directory error type and its HTTP mapping.

use axum::http::StatusCode;
use nsmock_common::{Address, SignatureError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no Authorization header found")]
    MissingAuthHeader,

    #[error("invalid auth header")]
    InvalidAuthHeader,

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("session token is invalid")]
    InvalidSession,

    #[error("session is not logged in")]
    NotLoggedIn,

    #[error("no session with nonce {0}")]
    NoSuchSession(String),

    #[error("session is already logged in")]
    AlreadyLoggedIn,

    #[error("no user found with authorized address {0}")]
    UnregisteredNode(Address),

    #[error("node {0} is not whitelisted")]
    NotWhitelisted(Address),

    #[error("node {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("node {0} belongs to another user")]
    NodeClaimed(Address),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("user {0} does not exist")]
    NoSuchUser(String),

    #[error("node {0} is not registered")]
    UnknownNode(Address),

    #[error("vault {address} on network {network} does not exist")]
    UnknownVault { address: Address, network: String },

    #[error("validator {0} does not exist")]
    UnknownValidator(String),

    #[error("snapshot with name [{0}] does not exist")]
    NoSuchSnapshot(String),
}

impl DirectoryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DirectoryError::InvalidInput(_)
            | DirectoryError::NotWhitelisted(_)
            | DirectoryError::AlreadyRegistered(_)
            | DirectoryError::NodeClaimed(_)
            | DirectoryError::AlreadyExists(_)
            | DirectoryError::AlreadyLoggedIn => StatusCode::BAD_REQUEST,

            DirectoryError::MissingAuthHeader
            | DirectoryError::InvalidAuthHeader
            | DirectoryError::InvalidSignature(_)
            | DirectoryError::InvalidSession
            | DirectoryError::NotLoggedIn
            | DirectoryError::UnregisteredNode(_) => StatusCode::UNAUTHORIZED,

            DirectoryError::NoSuchSession(_)
            | DirectoryError::NoSuchUser(_)
            | DirectoryError::UnknownNode(_)
            | DirectoryError::UnknownVault { .. }
            | DirectoryError::UnknownValidator(_)
            | DirectoryError::NoSuchSnapshot(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Machine-readable key placed in the envelope's `error` field.
    pub fn error_key(&self) -> &'static str {
        match self {
            DirectoryError::InvalidInput(_) => "invalid_input",
            DirectoryError::MissingAuthHeader => "missing_auth_header",
            DirectoryError::InvalidAuthHeader => "invalid_auth_header",
            DirectoryError::InvalidSignature(_) => "invalid_signature",
            DirectoryError::InvalidSession
            | DirectoryError::NotLoggedIn
            | DirectoryError::NoSuchSession(_) => "invalid_session",
            DirectoryError::AlreadyLoggedIn => "already_logged_in",
            DirectoryError::UnregisteredNode(_) => "unregistered_address",
            DirectoryError::NotWhitelisted(_) => "address_missing_whitelist",
            DirectoryError::AlreadyRegistered(_) => "address_already_registered",
            DirectoryError::NodeClaimed(_) => "address_claimed",
            DirectoryError::AlreadyExists(_) => "already_exists",
            DirectoryError::NoSuchUser(_) => "unknown_user",
            DirectoryError::UnknownNode(_) => "unknown_node",
            DirectoryError::UnknownVault { .. } => "unknown_vault",
            DirectoryError::UnknownValidator(_) => "unknown_validator",
            DirectoryError::NoSuchSnapshot(_) => "unknown_snapshot",
        }
    }
}
