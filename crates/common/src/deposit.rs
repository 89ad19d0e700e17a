//! Deposit data and signed exit payloads as exchanged with node operators.
//!
//! Neither payload is cryptographically checked here; the directory stores
//! them verbatim and only interprets `pubkey`, `withdrawal_credentials` and
//! `network_name`.

use serde::{Deserialize, Serialize};

use crate::types::{Address, HexBytes, ParseError, ValidatorPubkey};

/// Deposit data record produced by the staking deposit tooling, extended
/// with the fork version and network name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedDepositData {
    pub pubkey: HexBytes,
    pub withdrawal_credentials: HexBytes,
    pub amount: u64,
    pub signature: HexBytes,
    pub deposit_message_root: HexBytes,
    pub deposit_data_root: HexBytes,
    pub fork_version: HexBytes,
    pub network_name: String,
}

impl ExtendedDepositData {
    /// Parses `pubkey` as a 48-byte validator key.
    pub fn validator_pubkey(&self) -> Result<ValidatorPubkey, ParseError> {
        ValidatorPubkey::from_slice(self.pubkey.as_slice())
    }

    /// Address encoded in the withdrawal credentials (last 20 bytes). For
    /// StakeWise deposits this is the vault address.
    pub fn withdrawal_address(&self) -> Address {
        Address::from_slice_right_aligned(self.withdrawal_credentials.as_slice())
    }
}

/// Unsigned part of a voluntary exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitMessageDetails {
    pub epoch: String,
    pub validator_index: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitMessage {
    pub message: ExitMessageDetails,
    pub signature: String,
}

/// One entry of a signed-exit upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitData {
    pub pubkey: String,
    pub exit_message: ExitMessage,
}
