//! # NodeSetManager
//!
//! Thread-safe facade over the directory, sessions and snapshots. The HTTP
//! layer talks only to this type.
//!
//! ## Locking
//!
//! | Operation kind | Lock |
//! |----------------|------|
//! | reads (status, meta, lookups) | read |
//! | mutations, login, snapshot, revert | write, held for the whole operation |
//!
//! Signature recovery runs before the write lock is taken. Registration
//! checks the node's whitelist state first, so an unknown node is reported
//! as such whatever its signature. A failed operation leaves the state
//! untouched.

use parking_lot::RwLock;
use tracing::info;

use nsmock_common::crypto::{verify_login_signature, verify_registration_signature};
use nsmock_common::{
    Address, ExitData, ExtendedDepositData, StakeWiseStatus, ValidatorPubkey, ValidatorStatus,
};

use crate::directory::{Node, StakeWiseVault};
use crate::error::DirectoryError;
use crate::session::Session;
use crate::snapshot::{DirectoryState, SnapshotManager};

#[derive(Debug, Default)]
pub struct NodeSetManager {
    state: RwLock<SnapshotManager>,
}

impl NodeSetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: DirectoryState) -> Self {
        Self {
            state: RwLock::new(SnapshotManager::new(state)),
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ────────────────────────────────────────────────────────────────────────

    pub fn take_snapshot(&self, name: &str) {
        self.state.write().take_snapshot(name);
        info!(name = %name, "Took directory snapshot");
    }

    pub fn revert_to_snapshot(&self, name: &str) -> Result<(), DirectoryError> {
        self.state.write().revert_to_snapshot(name)?;
        info!(name = %name, "Reverted to directory snapshot");
        Ok(())
    }

    /// Replaces the live state with a custom-provisioned one.
    pub fn set_state(&self, state: DirectoryState) {
        self.state.write().replace_live(state);
        info!("Replaced live directory state");
    }

    /// Copy of the live state.
    pub fn state(&self) -> DirectoryState {
        self.state.read().live().clone()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Admin
    // ────────────────────────────────────────────────────────────────────────

    pub fn add_user(&self, email: &str) -> Result<(), DirectoryError> {
        self.state.write().live_mut().directory.add_user(email)?;
        info!(email = %email, "Added user");
        Ok(())
    }

    pub fn whitelist_node(&self, email: &str, address: Address) -> Result<(), DirectoryError> {
        self.state
            .write()
            .live_mut()
            .directory
            .whitelist_node(email, address)?;
        info!(email = %email, address = %address, "Whitelisted node");
        Ok(())
    }

    pub fn add_stakewise_vault(&self, address: Address, network: &str) -> Result<(), DirectoryError> {
        self.state
            .write()
            .live_mut()
            .directory
            .add_stakewise_vault(address, network)?;
        info!(vault = %address, network = %network, "Added StakeWise vault");
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Registration and sessions
    // ────────────────────────────────────────────────────────────────────────

    pub fn register_node(
        &self,
        email: &str,
        address: Address,
        signature: &[u8],
    ) -> Result<(), DirectoryError> {
        self.state
            .read()
            .live()
            .directory
            .check_registration(email, &address)?;
        verify_registration_signature(email, &address, signature)?;
        self.state
            .write()
            .live_mut()
            .directory
            .register_node(email, address)?;
        info!(email = %email, address = %address, "Registered node");
        Ok(())
    }

    pub fn create_session(&self) -> Session {
        self.state.write().live_mut().sessions.create_session()
    }

    /// Logs in the session created with `nonce`. `token` is the bearer token
    /// presented with the request and must be the token `nonce` was issued
    /// with. Returns the token to use from now on.
    pub fn login(
        &self,
        token: &str,
        nonce: &str,
        address: Address,
        signature: &[u8],
    ) -> Result<String, DirectoryError> {
        verify_login_signature(nonce, &address, signature)?;

        let mut guard = self.state.write();
        let live = guard.live_mut();
        let session = live
            .sessions
            .get_by_token(token)
            .ok_or(DirectoryError::InvalidSession)?;
        if session.nonce != nonce {
            return Err(DirectoryError::NoSuchSession(nonce.to_string()));
        }
        let session_token = session.token.clone();
        let registered = live.directory.is_registered(&address);
        live.sessions.login(nonce, address, registered)?;
        drop(guard);

        info!(nonce = %nonce, address = %address, "Logged into session");
        Ok(session_token)
    }

    pub fn get_session_by_nonce(&self, nonce: &str) -> Option<Session> {
        self.state.read().live().sessions.get_by_nonce(nonce).cloned()
    }

    pub fn get_session_by_token(&self, token: &str) -> Option<Session> {
        self.state.read().live().sessions.get_by_token(token).cloned()
    }

    /// Resolves a bearer token to the registered node it is logged in as.
    pub fn authenticate(&self, token: &str) -> Result<Address, DirectoryError> {
        let guard = self.state.read();
        let live = guard.live();
        let session = live
            .sessions
            .get_by_token(token)
            .ok_or(DirectoryError::InvalidSession)?;
        let address = match (session.is_logged_in, session.node_address) {
            (true, Some(address)) => address,
            _ => return Err(DirectoryError::NotLoggedIn),
        };
        if !live.directory.is_registered(&address) {
            return Err(DirectoryError::UnregisteredNode(address));
        }
        Ok(address)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Queries
    // ────────────────────────────────────────────────────────────────────────

    pub fn get_node(&self, address: &Address) -> Option<(Node, bool)> {
        self.state
            .read()
            .live()
            .directory
            .get_node(address)
            .map(|(n, registered)| (n.clone(), registered))
    }

    pub fn get_stakewise_vault(&self, address: &Address, network: &str) -> Option<StakeWiseVault> {
        self.state
            .read()
            .live()
            .directory
            .get_stakewise_vault(address, network)
            .cloned()
    }

    pub fn get_validator_status(&self, network: &str, pubkey: &ValidatorPubkey) -> StakeWiseStatus {
        self.state
            .read()
            .live()
            .directory
            .get_validator_status(network, pubkey)
    }

    pub fn validator_statuses(
        &self,
        address: &Address,
        network: &str,
    ) -> Result<Vec<ValidatorStatus>, DirectoryError> {
        self.state
            .read()
            .live()
            .directory
            .validator_statuses(address, network)
    }

    /// Version of the vault's latest deposit data set.
    pub fn deposit_data_version(&self, vault: &Address, network: &str) -> Result<u64, DirectoryError> {
        let guard = self.state.read();
        let vault = guard.live().directory.require_vault(vault, network)?;
        Ok(vault.latest_deposit_data_set_index)
    }

    /// Version and contents of the vault's latest deposit data set.
    pub fn deposit_data_set(
        &self,
        vault: &Address,
        network: &str,
    ) -> Result<(u64, Vec<ExtendedDepositData>), DirectoryError> {
        let guard = self.state.read();
        let vault = guard.live().directory.require_vault(vault, network)?;
        Ok((
            vault.latest_deposit_data_set_index,
            vault.latest_deposit_data_set.clone(),
        ))
    }

    // ────────────────────────────────────────────────────────────────────────
    // Uploads and allocation
    // ────────────────────────────────────────────────────────────────────────

    pub fn handle_deposit_data_upload(
        &self,
        address: &Address,
        data: &[ExtendedDepositData],
    ) -> Result<(), DirectoryError> {
        let added = self
            .state
            .write()
            .live_mut()
            .directory
            .handle_deposit_data_upload(address, data)?;
        info!(node = %address, received = data.len(), added, "Stored deposit data");
        Ok(())
    }

    pub fn handle_signed_exit_upload(
        &self,
        address: &Address,
        network: &str,
        exits: &[ExitData],
    ) -> Result<(), DirectoryError> {
        self.state
            .write()
            .live_mut()
            .directory
            .handle_signed_exit_upload(address, network, exits)?;
        info!(node = %address, network = %network, count = exits.len(), "Stored signed exits");
        Ok(())
    }

    pub fn create_deposit_data_set(&self, network: &str, per_user_limit: usize) -> Vec<ExtendedDepositData> {
        self.state
            .read()
            .live()
            .directory
            .create_deposit_data_set(network, per_user_limit)
    }

    pub fn upload_deposit_data_to_stakewise(
        &self,
        vault: &Address,
        network: &str,
        data: &[ExtendedDepositData],
    ) -> Result<(), DirectoryError> {
        self.state
            .write()
            .live_mut()
            .directory
            .upload_deposit_data_to_stakewise(vault, network, data)?;
        info!(vault = %vault, network = %network, count = data.len(), "Uploaded deposit data to StakeWise");
        Ok(())
    }

    pub fn mark_deposit_data_set_uploaded(
        &self,
        vault: &Address,
        network: &str,
        data: &[ExtendedDepositData],
    ) -> Result<u64, DirectoryError> {
        let version = self
            .state
            .write()
            .live_mut()
            .directory
            .mark_deposit_data_set_uploaded(vault, network, data)?;
        info!(vault = %vault, network = %network, version, "Marked deposit data set uploaded");
        Ok(version)
    }

    pub fn mark_validators_registered(
        &self,
        vault: &Address,
        network: &str,
        data: &[ExtendedDepositData],
    ) -> Result<(), DirectoryError> {
        self.state
            .write()
            .live_mut()
            .directory
            .mark_validators_registered(vault, network, data)?;
        info!(vault = %vault, network = %network, count = data.len(), "Marked validators registered");
        Ok(())
    }

    pub fn cycle_deposit_data_set(
        &self,
        vault: &Address,
        network: &str,
        per_user_limit: usize,
    ) -> Result<u64, DirectoryError> {
        let version = self
            .state
            .write()
            .live_mut()
            .directory
            .cycle_deposit_data_set(vault, network, per_user_limit)?;
        info!(vault = %vault, network = %network, version, "Cycled deposit data set");
        Ok(version)
    }
}
