//! Deposit data allocation and the StakeWise hand-off transitions.
//!
//! ```text
//! PENDING ──create_deposit_data_set──► batch
//!   batch ──upload_deposit_data_to_stakewise──► vault.uploaded_data ∋ pubkey
//!   batch ──mark_deposit_data_set_uploaded────► deposit_data_used, version += 1
//!   batch ──mark_validators_registered────────► marked_active
//! ```

use nsmock_common::{Address, ExtendedDepositData, ValidatorPubkey};

use crate::directory::{Directory, Validator};
use crate::error::DirectoryError;

impl Directory {
    /// Selects unused deposit data for `network`, at most `per_user_limit`
    /// entries per user. Users are visited in creation order, their nodes in
    /// registration order and each node's validators in upload order.
    pub fn create_deposit_data_set(
        &self,
        network: &str,
        per_user_limit: usize,
    ) -> Vec<ExtendedDepositData> {
        let mut set = Vec::new();
        if per_user_limit == 0 {
            return set;
        }

        for user in &self.users {
            let mut taken = 0;
            'nodes: for address in &user.registered_nodes {
                let validators = match self.nodes.get(address).and_then(|n| n.validators.get(network)) {
                    Some(v) => v,
                    None => continue,
                };
                for validator in validators.iter().filter(|v| !v.deposit_data_used) {
                    set.push(validator.deposit_data.clone());
                    taken += 1;
                    if taken >= per_user_limit {
                        break 'nodes;
                    }
                }
            }
        }
        set
    }

    /// Records that `data` was handed to the vault.
    pub fn upload_deposit_data_to_stakewise(
        &mut self,
        vault: &Address,
        network: &str,
        data: &[ExtendedDepositData],
    ) -> Result<(), DirectoryError> {
        let pubkeys = parse_pubkeys(data)?;
        let vault = self.vault_mut(vault, network)?;
        vault.uploaded_data.extend(pubkeys);
        Ok(())
    }

    /// Flags every validator in `data` on `network` as used, replaces its
    /// stored deposit data with the uploaded copy, and publishes `data` as
    /// the vault's new latest set. Returns the new set version.
    pub fn mark_deposit_data_set_uploaded(
        &mut self,
        vault: &Address,
        network: &str,
        data: &[ExtendedDepositData],
    ) -> Result<u64, DirectoryError> {
        self.require_vault(vault, network)?;
        let pubkeys = parse_pubkeys(data)?;

        for (pubkey, deposit) in pubkeys.iter().zip(data) {
            self.update_validators(network, pubkey, |validator| {
                validator.deposit_data = deposit.clone();
                validator.deposit_data_used = true;
            });
        }

        let vault = self.vault_mut(vault, network)?;
        vault.latest_deposit_data_set = data.to_vec();
        vault.latest_deposit_data_set_index += 1;
        Ok(vault.latest_deposit_data_set_index)
    }

    /// Flags every validator in `data` on `network` as active on the beacon
    /// chain.
    pub fn mark_validators_registered(
        &mut self,
        vault: &Address,
        network: &str,
        data: &[ExtendedDepositData],
    ) -> Result<(), DirectoryError> {
        self.require_vault(vault, network)?;
        let pubkeys = parse_pubkeys(data)?;

        for pubkey in &pubkeys {
            self.update_validators(network, pubkey, |validator| validator.marked_active = true);
        }
        Ok(())
    }

    /// Allocates, uploads and marks a new set in one step. Returns the new
    /// set version.
    pub fn cycle_deposit_data_set(
        &mut self,
        vault: &Address,
        network: &str,
        per_user_limit: usize,
    ) -> Result<u64, DirectoryError> {
        self.require_vault(vault, network)?;
        let set = self.create_deposit_data_set(network, per_user_limit);
        self.upload_deposit_data_to_stakewise(vault, network, &set)?;
        self.mark_deposit_data_set_uploaded(vault, network, &set)
    }
}

impl Directory {
    /// Applies `update` to every validator with `pubkey` on `network`
    /// across the registered nodes.
    fn update_validators<F>(&mut self, network: &str, pubkey: &ValidatorPubkey, mut update: F)
    where
        F: FnMut(&mut Validator),
    {
        for address in self.registered_addresses() {
            if let Some(validators) = self
                .nodes
                .get_mut(&address)
                .and_then(|n| n.validators.get_mut(network))
            {
                validators
                    .iter_mut()
                    .filter(|v| v.pubkey == *pubkey)
                    .for_each(&mut update);
            }
        }
    }
}

fn parse_pubkeys(data: &[ExtendedDepositData]) -> Result<Vec<ValidatorPubkey>, DirectoryError> {
    data.iter()
        .map(|d| {
            d.validator_pubkey().map_err(|e| {
                DirectoryError::InvalidInput(format!("invalid deposit data pubkey: {}", e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::tests::{deposit, node, registered_directory, vault, NETWORK};
    use nsmock_common::StakeWiseStatus;

    fn pk(seed: u8) -> ValidatorPubkey {
        ValidatorPubkey::new([seed; 48])
    }

    #[test]
    fn limit_zero_selects_nothing() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        assert!(dir.create_deposit_data_set(NETWORK, 0).is_empty());
    }

    #[test]
    fn set_respects_per_user_limit_and_order() {
        let mut dir = registered_directory();
        dir.whitelist_node("test@test.com", node(2)).unwrap();
        dir.register_node("test@test.com", node(2)).unwrap();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        dir.handle_deposit_data_upload(
            &node(2),
            &[deposit(0xb0, vault(), NETWORK), deposit(0xb1, vault(), NETWORK)],
        )
        .unwrap();

        let set = dir.create_deposit_data_set(NETWORK, 2);
        let seeds: Vec<u8> = set.iter().map(|d| d.pubkey.as_slice()[0]).collect();
        assert_eq!(seeds, vec![0xa0, 0xb0]);
    }

    #[test]
    fn set_never_crosses_networks() {
        let mut dir = registered_directory();
        dir.add_stakewise_vault(vault(), "mainnet").unwrap();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), "mainnet")])
            .unwrap();
        assert!(dir.create_deposit_data_set(NETWORK, 5).is_empty());
        assert_eq!(dir.create_deposit_data_set("mainnet", 5).len(), 1);
    }

    #[test]
    fn used_data_is_not_reallocated() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        let set = dir.create_deposit_data_set(NETWORK, 5);
        assert_eq!(dir.mark_deposit_data_set_uploaded(&vault(), NETWORK, &set), Ok(1));
        assert!(dir.create_deposit_data_set(NETWORK, 5).is_empty());
        assert_eq!(dir.get_validator_status(NETWORK, &pk(0xa0)), StakeWiseStatus::Uploaded);
    }

    #[test]
    fn status_lifecycle() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        assert_eq!(dir.get_validator_status(NETWORK, &pk(0xa0)), StakeWiseStatus::Pending);

        let set = dir.create_deposit_data_set(NETWORK, 1);
        dir.upload_deposit_data_to_stakewise(&vault(), NETWORK, &set).unwrap();
        assert_eq!(dir.get_validator_status(NETWORK, &pk(0xa0)), StakeWiseStatus::Uploaded);

        dir.mark_validators_registered(&vault(), NETWORK, &set).unwrap();
        assert_eq!(dir.get_validator_status(NETWORK, &pk(0xa0)), StakeWiseStatus::Registered);
        assert_eq!(dir.get_validator_status(NETWORK, &pk(0xff)), StakeWiseStatus::Unknown);
    }

    #[test]
    fn mark_replaces_stored_deposit_data() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        let mut uploaded = dir.create_deposit_data_set(NETWORK, 1);
        uploaded[0].amount = 1;
        dir.mark_deposit_data_set_uploaded(&vault(), NETWORK, &uploaded).unwrap();

        let (n, _) = dir.get_node(&node(1)).unwrap();
        assert_eq!(n.validator(NETWORK, &pk(0xa0)).unwrap().deposit_data.amount, 1);
        let v = dir.get_stakewise_vault(&vault(), NETWORK).unwrap();
        assert_eq!(v.latest_deposit_data_set, uploaded);
        assert_eq!(v.latest_deposit_data_set_index, 1);
    }

    #[test]
    fn unknown_vault_is_checked_first() {
        let mut dir = registered_directory();
        let before = dir.clone();
        for result in [
            dir.clone().upload_deposit_data_to_stakewise(&node(9), NETWORK, &[]),
            dir.clone().mark_validators_registered(&node(9), NETWORK, &[]),
        ] {
            assert!(matches!(result, Err(DirectoryError::UnknownVault { .. })));
        }
        assert!(matches!(
            dir.mark_deposit_data_set_uploaded(&node(9), NETWORK, &[]),
            Err(DirectoryError::UnknownVault { .. })
        ));
        assert!(matches!(
            dir.cycle_deposit_data_set(&node(9), NETWORK, 1),
            Err(DirectoryError::UnknownVault { .. })
        ));
        assert_eq!(dir, before);
    }

    #[test]
    fn cycle_bumps_version_even_when_empty() {
        let mut dir = registered_directory();
        assert_eq!(dir.cycle_deposit_data_set(&vault(), NETWORK, 1), Ok(1));
        assert_eq!(dir.cycle_deposit_data_set(&vault(), NETWORK, 1), Ok(2));
        assert!(dir
            .get_stakewise_vault(&vault(), NETWORK)
            .unwrap()
            .latest_deposit_data_set
            .is_empty());
    }

    #[test]
    fn vault_transitions_use_the_vault_network() {
        let mut dir = registered_directory();
        dir.handle_deposit_data_upload(&node(1), &[deposit(0xa0, vault(), NETWORK)])
            .unwrap();
        let mut relabelled = dir.create_deposit_data_set(NETWORK, 1);
        relabelled[0].network_name = "mainnet".to_string();

        dir.upload_deposit_data_to_stakewise(&vault(), NETWORK, &relabelled).unwrap();
        dir.mark_deposit_data_set_uploaded(&vault(), NETWORK, &relabelled).unwrap();
        dir.mark_validators_registered(&vault(), NETWORK, &relabelled).unwrap();

        let (n, _) = dir.get_node(&node(1)).unwrap();
        let v = n.validator(NETWORK, &pk(0xa0)).unwrap();
        assert!(v.deposit_data_used);
        assert!(v.marked_active);
        assert_eq!(dir.get_validator_status(NETWORK, &pk(0xa0)), StakeWiseStatus::Registered);
    }
}
