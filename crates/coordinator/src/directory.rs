//! # Directory
//!
//! Relational in-memory store of users, their nodes, the validators those
//! nodes deposited, and the StakeWise vaults deposits are destined for.
//!
//! ## Layout
//!
//! ```text
//! users (creation order)           nodes (by address)            vaults (network → address)
//! ┌──────────────────────┐         ┌──────────────────────┐      ┌──────────────────────────┐
//! │ email, index         │  owns   │ address, owner       │      │ uploaded_data: {pubkey}  │
//! │ whitelisted_nodes ───┼────────▶│ registered           │      │ latest_deposit_data_set  │
//! │ registered_nodes  ───┼────────▶│ validators:          │      │ latest_..._index         │
//! └──────────────────────┘         │   network → [Validator]│    └──────────────────────────┘
//!                                  └──────────────────────┘
//! ```
//!
//! Cross references are key lookups (email, address, pubkey), so a plain
//! `Clone` produces a fully independent copy.
//!
//! ## Invariants
//!
//! - A node address belongs to at most one user, and sits in exactly one of
//!   that user's `whitelisted_nodes` / `registered_nodes`.
//! - A pubkey appears at most once per node and network.
//! - Batch mutations validate every entry before changing anything.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use nsmock_common::{
    Address, ExitData, ExitMessage, ExtendedDepositData, StakeWiseStatus, ValidatorPubkey,
    ValidatorStatus,
};

use crate::error::DirectoryError;

// ════════════════════════════════════════════════════════════════════════════════
// ENTITIES
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    /// Creation order; drives allocation order.
    pub index: usize,
    pub whitelisted_nodes: Vec<Address>,
    /// Registration order; drives allocation order within the user.
    pub registered_nodes: Vec<Address>,
}

impl User {
    fn new(email: String, index: usize) -> Self {
        Self {
            email,
            index,
            whitelisted_nodes: Vec::new(),
            registered_nodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub pubkey: ValidatorPubkey,
    pub vault_address: Address,
    pub deposit_data: ExtendedDepositData,
    pub signed_exit: Option<ExitMessage>,
    pub deposit_data_used: bool,
    pub exit_message_uploaded: bool,
    pub marked_active: bool,
}

impl Validator {
    fn new(pubkey: ValidatorPubkey, deposit_data: ExtendedDepositData) -> Self {
        Self {
            pubkey,
            vault_address: deposit_data.withdrawal_address(),
            deposit_data,
            signed_exit: None,
            deposit_data_used: false,
            exit_message_uploaded: false,
            marked_active: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub address: Address,
    /// Email of the owning user.
    pub owner: String,
    pub registered: bool,
    /// Network name → validators in upload order.
    pub validators: BTreeMap<String, Vec<Validator>>,
}

impl Node {
    fn new(address: Address, owner: String) -> Self {
        Self {
            address,
            owner,
            registered: false,
            validators: BTreeMap::new(),
        }
    }

    pub fn validator(&self, network: &str, pubkey: &ValidatorPubkey) -> Option<&Validator> {
        self.validators
            .get(network)?
            .iter()
            .find(|v| v.pubkey == *pubkey)
    }

    fn has_validator(&self, network: &str, pubkey: &ValidatorPubkey) -> bool {
        self.validator(network, pubkey).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeWiseVault {
    pub address: Address,
    pub network: String,
    pub uploaded_data: BTreeSet<ValidatorPubkey>,
    pub latest_deposit_data_set_index: u64,
    pub latest_deposit_data_set: Vec<ExtendedDepositData>,
}

impl StakeWiseVault {
    fn new(address: Address, network: String) -> Self {
        Self {
            address,
            network,
            uploaded_data: BTreeSet::new(),
            latest_deposit_data_set_index: 0,
            latest_deposit_data_set: Vec::new(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// DIRECTORY
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub(crate) users: Vec<User>,
    pub(crate) user_index: HashMap<String, usize>,
    pub(crate) nodes: HashMap<Address, Node>,
    pub(crate) vaults: BTreeMap<String, BTreeMap<Address, StakeWiseVault>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Users and nodes
    // ────────────────────────────────────────────────────────────────────────

    pub fn add_user(&mut self, email: &str) -> Result<(), DirectoryError> {
        if self.user_index.contains_key(email) {
            return Err(DirectoryError::AlreadyExists(format!("user with email [{}]", email)));
        }
        let index = self.users.len();
        self.users.push(User::new(email.to_string(), index));
        self.user_index.insert(email.to_string(), index);
        Ok(())
    }

    /// Users in creation order.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, email: &str) -> Option<&User> {
        self.user_index.get(email).map(|&i| &self.users[i])
    }

    fn user_position(&self, email: &str) -> Result<usize, DirectoryError> {
        self.user_index
            .get(email)
            .copied()
            .ok_or_else(|| DirectoryError::NoSuchUser(email.to_string()))
    }

    /// Whitelists `address` for the user. Re-whitelisting a node the user
    /// already owns is a no-op.
    pub fn whitelist_node(&mut self, email: &str, address: Address) -> Result<(), DirectoryError> {
        let pos = self.user_position(email)?;
        if let Some(node) = self.nodes.get(&address) {
            if node.owner == email {
                return Ok(());
            }
            return Err(DirectoryError::NodeClaimed(address));
        }

        self.nodes.insert(address, Node::new(address, email.to_string()));
        self.users[pos].whitelisted_nodes.push(address);
        Ok(())
    }

    /// Checks that `address` is whitelisted for the user and not yet
    /// registered. Returns the user's position.
    pub fn check_registration(&self, email: &str, address: &Address) -> Result<usize, DirectoryError> {
        let pos = self.user_position(email)?;
        let node = self
            .nodes
            .get(address)
            .ok_or(DirectoryError::NotWhitelisted(*address))?;
        if node.registered {
            return Err(DirectoryError::AlreadyRegistered(*address));
        }
        if node.owner != email {
            return Err(DirectoryError::NotWhitelisted(*address));
        }
        Ok(pos)
    }

    /// Moves a whitelisted node into the user's registered list.
    pub fn register_node(&mut self, email: &str, address: Address) -> Result<(), DirectoryError> {
        let pos = self.check_registration(email, &address)?;
        let node = self
            .nodes
            .get_mut(&address)
            .ok_or(DirectoryError::NotWhitelisted(address))?;
        node.registered = true;
        let user = &mut self.users[pos];
        user.whitelisted_nodes.retain(|a| *a != address);
        user.registered_nodes.push(address);
        Ok(())
    }

    /// Returns the node and whether it is registered (as opposed to only
    /// whitelisted).
    pub fn get_node(&self, address: &Address) -> Option<(&Node, bool)> {
        self.nodes.get(address).map(|n| (n, n.registered))
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.nodes.get(address).map(|n| n.registered).unwrap_or(false)
    }

    fn registered_node(&self, address: &Address) -> Result<&Node, DirectoryError> {
        match self.nodes.get(address) {
            Some(node) if node.registered => Ok(node),
            _ => Err(DirectoryError::UnknownNode(*address)),
        }
    }

    /// Registered node addresses, users in creation order, nodes in
    /// registration order.
    pub(crate) fn registered_addresses(&self) -> Vec<Address> {
        self.users
            .iter()
            .flat_map(|u| u.registered_nodes.iter().copied())
            .collect()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Vaults
    // ────────────────────────────────────────────────────────────────────────

    pub fn add_stakewise_vault(&mut self, address: Address, network: &str) -> Result<(), DirectoryError> {
        let vaults = self.vaults.entry(network.to_string()).or_default();
        if vaults.contains_key(&address) {
            return Err(DirectoryError::AlreadyExists(format!(
                "stakewise vault with address [{}] on network [{}]",
                address, network
            )));
        }
        vaults.insert(address, StakeWiseVault::new(address, network.to_string()));
        Ok(())
    }

    pub fn get_stakewise_vault(&self, address: &Address, network: &str) -> Option<&StakeWiseVault> {
        self.vaults.get(network)?.get(address)
    }

    pub(crate) fn vault_mut(
        &mut self,
        address: &Address,
        network: &str,
    ) -> Result<&mut StakeWiseVault, DirectoryError> {
        self.vaults
            .get_mut(network)
            .and_then(|v| v.get_mut(address))
            .ok_or_else(|| DirectoryError::UnknownVault {
                address: *address,
                network: network.to_string(),
            })
    }

    pub(crate) fn require_vault(&self, address: &Address, network: &str) -> Result<&StakeWiseVault, DirectoryError> {
        self.get_stakewise_vault(address, network)
            .ok_or_else(|| DirectoryError::UnknownVault {
                address: *address,
                network: network.to_string(),
            })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Uploads
    // ────────────────────────────────────────────────────────────────────────

    /// Stores new deposit data for a registered node. Pubkeys already known
    /// to the node on that network are left untouched.
    pub fn handle_deposit_data_upload(
        &mut self,
        address: &Address,
        data: &[ExtendedDepositData],
    ) -> Result<usize, DirectoryError> {
        self.registered_node(address)?;

        let mut parsed = Vec::with_capacity(data.len());
        for deposit in data {
            let pubkey = deposit.validator_pubkey().map_err(|e| {
                DirectoryError::InvalidInput(format!("invalid deposit data pubkey: {}", e))
            })?;
            self.require_vault(&deposit.withdrawal_address(), &deposit.network_name)?;
            parsed.push(pubkey);
        }

        let node = self
            .nodes
            .get_mut(address)
            .ok_or(DirectoryError::UnknownNode(*address))?;
        let mut added = 0;
        for (pubkey, deposit) in parsed.into_iter().zip(data) {
            if node.has_validator(&deposit.network_name, &pubkey) {
                continue;
            }
            node.validators
                .entry(deposit.network_name.clone())
                .or_default()
                .push(Validator::new(pubkey, deposit.clone()));
            added += 1;
        }
        Ok(added)
    }

    /// Attaches signed exits to a registered node's validators. A later
    /// upload for the same pubkey replaces the earlier one.
    pub fn handle_signed_exit_upload(
        &mut self,
        address: &Address,
        network: &str,
        exits: &[ExitData],
    ) -> Result<(), DirectoryError> {
        let node = self.registered_node(address)?;

        let mut parsed = Vec::with_capacity(exits.len());
        for exit in exits {
            let pubkey = ValidatorPubkey::from_hex(&exit.pubkey).map_err(|e| {
                DirectoryError::InvalidInput(format!("invalid validator pubkey [{}]: {}", exit.pubkey, e))
            })?;
            if !node.has_validator(network, &pubkey) {
                return Err(DirectoryError::UnknownValidator(pubkey.to_string()));
            }
            parsed.push(pubkey);
        }

        let node = self
            .nodes
            .get_mut(address)
            .ok_or(DirectoryError::UnknownNode(*address))?;
        if let Some(validators) = node.validators.get_mut(network) {
            for (pubkey, exit) in parsed.iter().zip(exits) {
                if let Some(v) = validators.iter_mut().find(|v| v.pubkey == *pubkey) {
                    v.signed_exit = Some(exit.exit_message.clone());
                    v.exit_message_uploaded = true;
                }
            }
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Status
    // ────────────────────────────────────────────────────────────────────────

    /// First validator with `pubkey` on `network`, searching registered
    /// nodes in allocation order.
    pub fn find_validator(&self, network: &str, pubkey: &ValidatorPubkey) -> Option<&Validator> {
        self.users
            .iter()
            .flat_map(|u| u.registered_nodes.iter())
            .filter_map(|a| self.nodes.get(a))
            .find_map(|n| n.validator(network, pubkey))
    }

    pub fn get_validator_status(&self, network: &str, pubkey: &ValidatorPubkey) -> StakeWiseStatus {
        let validator = match self.find_validator(network, pubkey) {
            Some(v) => v,
            None => return StakeWiseStatus::Unknown,
        };

        let acknowledged = self
            .get_stakewise_vault(&validator.vault_address, network)
            .map(|vault| vault.uploaded_data.contains(pubkey))
            .unwrap_or(false);

        if acknowledged && validator.marked_active {
            StakeWiseStatus::Registered
        } else if acknowledged || validator.deposit_data_used {
            StakeWiseStatus::Uploaded
        } else {
            StakeWiseStatus::Pending
        }
    }

    /// Status of every validator a registered node has on `network`, in
    /// upload order.
    pub fn validator_statuses(
        &self,
        address: &Address,
        network: &str,
    ) -> Result<Vec<ValidatorStatus>, DirectoryError> {
        let node = self.registered_node(address)?;
        let statuses = node
            .validators
            .get(network)
            .map(|validators| {
                validators
                    .iter()
                    .map(|v| ValidatorStatus {
                        pubkey: v.pubkey,
                        status: self.get_validator_status(network, &v.pubkey),
                        exit_message_uploaded: v.exit_message_uploaded,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(statuses)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nsmock_common::{ExitMessageDetails, HexBytes};

    pub(crate) const NETWORK: &str = "holesky";

    pub(crate) fn vault() -> Address {
        Address::new([0x57; 20])
    }

    pub(crate) fn node(n: u8) -> Address {
        Address::new([n; 20])
    }

    pub(crate) fn deposit(seed: u8, vault: Address, network: &str) -> ExtendedDepositData {
        let mut creds = vec![0x01];
        creds.extend_from_slice(&[0u8; 11]);
        creds.extend_from_slice(vault.as_bytes());
        ExtendedDepositData {
            pubkey: HexBytes(vec![seed; 48]),
            withdrawal_credentials: HexBytes(creds),
            amount: 32_000_000_000,
            signature: HexBytes(vec![seed; 96]),
            deposit_message_root: HexBytes(vec![seed; 32]),
            deposit_data_root: HexBytes(vec![seed; 32]),
            fork_version: HexBytes(vec![0x01, 0x01, 0x70, 0x00]),
            network_name: network.to_string(),
        }
    }

    pub(crate) fn exit(seed: u8, epoch: &str) -> ExitData {
        ExitData {
            pubkey: ValidatorPubkey::new([seed; 48]).to_string(),
            exit_message: ExitMessage {
                message: ExitMessageDetails {
                    epoch: epoch.to_string(),
                    validator_index: seed.to_string(),
                },
                signature: "0x00".to_string(),
            },
        }
    }

    /// One user, one registered node, one vault.
    pub(crate) fn registered_directory() -> Directory {
        let mut dir = Directory::new();
        dir.add_user("test@test.com").unwrap();
        dir.whitelist_node("test@test.com", node(1)).unwrap();
        dir.register_node("test@test.com", node(1)).unwrap();
        dir.add_stakewise_vault(vault(), NETWORK).unwrap();
        dir
    }

    #[test]
    fn add_user_twice_fails() {
        let mut dir = Directory::new();
        dir.add_user("a@b.c").unwrap();
        assert!(matches!(dir.add_user("a@b.c"), Err(DirectoryError::AlreadyExists(_))));
        assert_eq!(dir.users().len(), 1);
    }

    #[test]
    fn whitelist_requires_user() {
        let mut dir = Directory::new();
        assert_eq!(
            dir.whitelist_node("nobody@x.y", node(1)),
            Err(DirectoryError::NoSuchUser("nobody@x.y".into()))
        );
    }

    #[test]
    fn whitelist_is_idempotent_for_owner() {
        let mut dir = Directory::new();
        dir.add_user("a@b.c").unwrap();
        dir.whitelist_node("a@b.c", node(1)).unwrap();
        dir.whitelist_node("a@b.c", node(1)).unwrap();
        assert_eq!(dir.user("a@b.c").unwrap().whitelisted_nodes, vec![node(1)]);

        dir.register_node("a@b.c", node(1)).unwrap();
        dir.whitelist_node("a@b.c", node(1)).unwrap();
        let user = dir.user("a@b.c").unwrap();
        assert!(user.whitelisted_nodes.is_empty());
        assert_eq!(user.registered_nodes, vec![node(1)]);
    }

    #[test]
    fn node_cannot_belong_to_two_users() {
        let mut dir = Directory::new();
        dir.add_user("a@b.c").unwrap();
        dir.add_user("d@e.f").unwrap();
        dir.whitelist_node("a@b.c", node(1)).unwrap();
        assert_eq!(
            dir.whitelist_node("d@e.f", node(1)),
            Err(DirectoryError::NodeClaimed(node(1)))
        );
        assert_eq!(
            dir.register_node("d@e.f", node(1)),
            Err(DirectoryError::NotWhitelisted(node(1)))
        );
    }

    #[test]
    fn register_transitions() {
        let mut dir = Directory::new();
        dir.add_user("a@b.c").unwrap();
        assert_eq!(
            dir.register_node("a@b.c", node(1)),
            Err(DirectoryError::NotWhitelisted(node(1)))
        );
        dir.whitelist_node("a@b.c", node(1)).unwrap();
        assert_eq!(dir.get_node(&node(1)).map(|(_, r)| r), Some(false));
        dir.register_node("a@b.c", node(1)).unwrap();
        assert_eq!(dir.get_node(&node(1)).map(|(_, r)| r), Some(true));
        assert_eq!(
            dir.register_node("a@b.c", node(1)),
            Err(DirectoryError::AlreadyRegistered(node(1)))
        );
    }

    #[test]
    fn vault_unique_per_network() {
        let mut dir = Directory::new();
        dir.add_stakewise_vault(vault(), "holesky").unwrap();
        dir.add_stakewise_vault(vault(), "mainnet").unwrap();
        assert!(matches!(
            dir.add_stakewise_vault(vault(), "holesky"),
            Err(DirectoryError::AlreadyExists(_))
        ));
        assert!(dir.get_stakewise_vault(&vault(), "mainnet").is_some());
        assert!(dir.get_stakewise_vault(&node(9), "holesky").is_none());
    }

    #[test]
    fn upload_is_idempotent() {
        let mut dir = registered_directory();
        let batch = vec![deposit(0xa0, vault(), NETWORK)];
        assert_eq!(dir.handle_deposit_data_upload(&node(1), &batch), Ok(1));
        let before = dir.clone();
        assert_eq!(dir.handle_deposit_data_upload(&node(1), &batch), Ok(0));
        assert_eq!(dir, before);
    }

    #[test]
    fn upload_rejects_whole_batch_on_unknown_vault() {
        let mut dir = registered_directory();
        let batch = vec![
            deposit(0xa0, vault(), NETWORK),
            deposit(0xa1, node(9), NETWORK),
        ];
        assert!(matches!(
            dir.handle_deposit_data_upload(&node(1), &batch),
            Err(DirectoryError::UnknownVault { .. })
        ));
        assert_eq!(
            dir.get_validator_status(NETWORK, &ValidatorPubkey::new([0xa0; 48])),
            StakeWiseStatus::Unknown
        );
    }

    #[test]
    fn upload_requires_registered_node() {
        let mut dir = registered_directory();
        dir.whitelist_node("test@test.com", node(2)).unwrap();
        let batch = vec![deposit(0xa0, vault(), NETWORK)];
        assert_eq!(
            dir.handle_deposit_data_upload(&node(2), &batch),
            Err(DirectoryError::UnknownNode(node(2)))
        );
    }

    #[test]
    fn upload_rejects_malformed_pubkey() {
        let mut dir = registered_directory();
        let mut bad = deposit(0xa0, vault(), NETWORK);
        bad.pubkey = HexBytes(vec![1, 2, 3]);
        assert!(matches!(
            dir.handle_deposit_data_upload(&node(1), &[bad]),
            Err(DirectoryError::InvalidInput(_))
        ));
    }

    #[test]
    fn signed_exit_last_write_wins() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        dir.handle_signed_exit_upload(&node(1), NETWORK, &[exit(0xa0, "10")])
            .unwrap();
        dir.handle_signed_exit_upload(&node(1), NETWORK, &[exit(0xa0, "20")])
            .unwrap();

        let (n, _) = dir.get_node(&node(1)).unwrap();
        let v = n.validator(NETWORK, &ValidatorPubkey::new([0xa0; 48])).unwrap();
        assert!(v.exit_message_uploaded);
        assert_eq!(v.signed_exit.as_ref().unwrap().message.epoch, "20");
    }

    #[test]
    fn signed_exit_unknown_validator_changes_nothing() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        let before = dir.clone();
        let result = dir.handle_signed_exit_upload(
            &node(1),
            NETWORK,
            &[exit(0xa0, "10"), exit(0xb0, "10")],
        );
        assert!(matches!(result, Err(DirectoryError::UnknownValidator(_))));
        assert_eq!(dir, before);
    }

    #[test]
    fn signed_exit_malformed_pubkey() {
        let mut dir = registered_directory();
        let mut bad = exit(0xa0, "1");
        bad.pubkey = "0x1234".into();
        assert!(matches!(
            dir.handle_signed_exit_upload(&node(1), NETWORK, &[bad]),
            Err(DirectoryError::InvalidInput(_))
        ));
    }

    #[test]
    fn statuses_in_upload_order() {
        let mut dir = registered_directory();
        let batch: Vec<_> = [0xa2, 0xa0, 0xa1]
            .iter()
            .map(|s| deposit(*s, vault(), NETWORK))
            .collect();
        dir.handle_deposit_data_upload(&node(1), &batch).unwrap();

        let statuses = dir.validator_statuses(&node(1), NETWORK).unwrap();
        let order: Vec<u8> = statuses.iter().map(|s| s.pubkey.as_bytes()[0]).collect();
        assert_eq!(order, vec![0xa2, 0xa0, 0xa1]);
        assert!(statuses.iter().all(|s| s.status == StakeWiseStatus::Pending));
        assert!(dir.validator_statuses(&node(1), "mainnet").unwrap().is_empty());
    }

    #[test]
    fn clone_is_independent() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        let copy = dir.clone();
        dir.add_user("other@x.y").unwrap();
        dir.handle_signed_exit_upload(&node(1), NETWORK, &[exit(0xa0, "5")])
            .unwrap();

        assert!(copy.user("other@x.y").is_none());
        let (n, _) = copy.get_node(&node(1)).unwrap();
        assert!(!n.validator(NETWORK, &ValidatorPubkey::new([0xa0; 48])).unwrap().exit_message_uploaded);
    }
}
