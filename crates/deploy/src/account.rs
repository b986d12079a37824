//! Deployer key material and the account derived from it.

use std::fmt;

use alloy_core::primitives::{Address, B256, Signature};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::Context;
use derive_more::{Deref, Display};

use crate::error::{DeployError, DeployResult};

/// Private key material used to sign transactions.
///
/// The core only checks the format loosely; the key is parsed into a secp256k1
/// scalar once, when the account is derived.
#[derive(Clone)]
pub struct DeploymentKey {
    label: String,
    signer: PrivateKeySigner,
}

impl DeploymentKey {
    /// Parse a hex private key (with or without `0x`). `label` names the config key.
    pub fn parse(label: &str, secret: &str) -> DeployResult<Self> {
        let invalid = || DeployError::InvalidCredential {
            key: label.to_string(),
        };
        let secret = secret.trim();
        let secret = secret.strip_prefix("0x").unwrap_or(secret);
        let bytes: [u8; 32] = hex::decode(secret)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        let signer = PrivateKeySigner::from_bytes(&B256::from(bytes)).map_err(|_| invalid())?;
        Ok(Self {
            label: label.to_string(),
            signer,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The address controlled by this key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn account(&self) -> AccountHandle {
        AccountHandle(self.address())
    }

    /// Sign a 32-byte prehash.
    pub(crate) fn sign_hash(&self, hash: &B256) -> anyhow::Result<Signature> {
        self.signer
            .sign_hash_sync(hash)
            .context("Failed to sign transaction hash")
    }
}

impl fmt::Debug for DeploymentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentKey")
            .field("label", &self.label)
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// The account every transaction of a run is sent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deref, Display)]
pub struct AccountHandle(Address);

impl AccountHandle {
    pub fn address(&self) -> Address {
        self.0
    }
}
