//! EIP-155 legacy transactions, signed locally.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Address, B256, Bytes, U256};
use alloy_eips::eip2718::Encodable2718;

pub use alloy_core::primitives::TxKind;

use crate::account::DeploymentKey;

/// Largest chain id whose EIP-155 `v` still fits in 64 bits (EIP-2294).
pub const MAX_CHAIN_ID: u64 = u64::MAX / 2 - 36;

/// A fully specified, unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: TxKind,
    pub value: U256,
    pub input: Bytes,
}

impl TransactionRequest {
    pub fn to_legacy(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            input: self.input.clone(),
        }
    }

    /// Hash signed by the sender: `keccak256(rlp([.., chain_id, 0, 0]))`.
    pub fn signing_hash(&self) -> B256 {
        self.to_legacy().signature_hash()
    }

    pub fn sign(self, key: &DeploymentKey) -> anyhow::Result<SignedTransaction> {
        if self.chain_id > MAX_CHAIN_ID {
            anyhow::bail!(
                "chain id {} is too large for an EIP-155 signature (max {MAX_CHAIN_ID})",
                self.chain_id
            );
        }

        let tx = self.to_legacy();
        let signature = key.sign_hash(&tx.signature_hash())?;
        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::from(signed).encoded_2718().into();

        Ok(SignedTransaction {
            request: self,
            from: key.address(),
            raw,
            hash,
        })
    }
}

/// A signed transaction, ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub request: TransactionRequest,
    pub from: Address,
    pub raw: Bytes,
    pub hash: B256,
}
