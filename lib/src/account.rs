//! [LedgerAccount] for account-based operations

use ed25519_dalek::VerifyingKey;

use ledger_ton_apdu::path::AccountPath;
use ledger_ton_core::{
    wallet::{self, WalletDescriptor},
    MsgAddress,
};

use crate::Error;

/// Account resolved from a hardware wallet
///
/// See [DeviceHandle::get_account][super::DeviceHandle::get_account] to
/// fetch a [LedgerAccount]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LedgerAccount {
    /// Derivation path for the account
    pub path: AccountPath,
    /// Ed25519 public key reported by the device
    pub public_key: [u8; 32],
    /// Default wallet contract for the account
    pub contract: WalletDescriptor,
    /// Wallet contract address
    pub address: MsgAddress,
}

impl LedgerAccount {
    /// Create an account descriptor for a path and public key
    pub fn new(path: AccountPath, public_key: [u8; 32]) -> Result<Self, Error> {
        let contract = wallet::contract(&path, public_key);

        Ok(Self {
            path,
            public_key,
            contract,
            address: contract.address()?,
        })
    }

    /// User-friendly wallet address, testnet-flagged for testnet paths
    pub fn friendly_address(&self, bounceable: bool) -> String {
        self.address
            .to_base64_url_flags(!bounceable, self.path.testnet)
    }

    /// Account public key as an ed25519 verifying key
    pub fn verifying_key(&self) -> Result<VerifyingKey, Error> {
        VerifyingKey::from_bytes(&self.public_key).map_err(|_| Error::InvalidKey)
    }
}
