//! Login sessions.
//!
//! A session starts with a random token and a nonce derived from it. The
//! client signs the nonce with its node key, logs in, and from then on
//! presents the token as a bearer credential.

use std::collections::HashMap;

use nsmock_common::types::encode_hex_with_prefix;
use nsmock_common::Address;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::DirectoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub nonce: String,
    pub token: String,
    /// Set once the session logs in.
    pub node_address: Option<Address>,
    pub is_logged_in: bool,
}

impl Session {
    fn new() -> Self {
        let token = Uuid::new_v4().to_string();
        let nonce = encode_hex_with_prefix(&Sha256::digest(token.as_bytes()));
        Self {
            nonce,
            token,
            node_address: None,
            is_logged_in: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStore {
    sessions: Vec<Session>,
    by_nonce: HashMap<String, usize>,
    by_token: HashMap<String, usize>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&mut self) -> Session {
        let session = Session::new();
        let idx = self.sessions.len();
        self.by_nonce.insert(session.nonce.clone(), idx);
        self.by_token.insert(session.token.clone(), idx);
        self.sessions.push(session.clone());
        session
    }

    /// Logs the session identified by `nonce` in as `address`.
    /// `node_registered` tells whether `address` is a registered node.
    pub fn login(
        &mut self,
        nonce: &str,
        address: Address,
        node_registered: bool,
    ) -> Result<(), DirectoryError> {
        let idx = *self
            .by_nonce
            .get(nonce)
            .ok_or_else(|| DirectoryError::NoSuchSession(nonce.to_string()))?;
        let session = &mut self.sessions[idx];
        if session.is_logged_in {
            return Err(DirectoryError::AlreadyLoggedIn);
        }
        if !node_registered {
            return Err(DirectoryError::UnregisteredNode(address));
        }
        session.node_address = Some(address);
        session.is_logged_in = true;
        Ok(())
    }

    pub fn get_by_nonce(&self, nonce: &str) -> Option<&Session> {
        self.by_nonce.get(nonce).map(|&i| &self.sessions[i])
    }

    pub fn get_by_token(&self, token: &str) -> Option<&Session> {
        self.by_token.get(token).map(|&i| &self.sessions[i])
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
