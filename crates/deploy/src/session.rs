//! An open connection to a chain, bound to the deployer account.

use alloy_core::primitives::{Address, B256, Bytes, U256};

use crate::account::{AccountHandle, DeploymentKey};
use crate::connector::ConfirmationPolicy;
use crate::contracts::{ArtifactSource, ContractArtifact, TokenHandle};
use crate::error::{DeployError, DeployResult};
use crate::network::NetworkProfile;
use crate::rpc::{CallRequest, Provider, TransactionReceipt, poll_until};
use crate::tx::{TransactionRequest, TxKind};

/// Per-transaction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub signer: AccountHandle,
    /// Estimated by the node when unset.
    pub gas_limit: Option<u64>,
}

impl TxOptions {
    pub fn new(signer: AccountHandle) -> Self {
        Self {
            signer,
            gas_limit: None,
        }
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// A connected session. Transactions go through `&mut self`, one at a time,
/// with nonces handed out strictly in submission order.
#[derive(Debug)]
pub struct Session<P> {
    profile: NetworkProfile,
    chain_id: u64,
    provider: P,
    key: DeploymentKey,
    next_nonce: u64,
    confirmation: ConfirmationPolicy,
}

impl<P: Provider> Session<P> {
    pub(crate) fn new(
        profile: NetworkProfile,
        chain_id: u64,
        provider: P,
        key: DeploymentKey,
        next_nonce: u64,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        Self {
            profile,
            chain_id,
            provider,
            key,
            next_nonce,
            confirmation,
        }
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn account(&self) -> AccountHandle {
        self.key.account()
    }

    pub fn next_nonce(&self) -> u64 {
        self.next_nonce
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Options for a transaction from the session's account.
    pub fn tx_options(&self) -> TxOptions {
        TxOptions::new(self.account())
    }

    /// Sign, send and wait for one transaction. `label` tags any failure.
    pub async fn submit(
        &mut self,
        label: &str,
        to: TxKind,
        input: Bytes,
        opts: &TxOptions,
    ) -> DeployResult<TransactionReceipt> {
        if opts.signer != self.account() {
            return Err(DeployError::InvalidState(format!(
                "{label}: signer {} is not the session account {}",
                opts.signer,
                self.account()
            )));
        }

        let request = self
            .build_request(to, input, opts)
            .await
            .map_err(|e| DeployError::failed(label, &e))?;
        let signed = request
            .sign(&self.key)
            .map_err(|e| DeployError::failed(label, &e))?;

        let tx_hash = self
            .provider
            .send_transaction(&signed)
            .await
            .map_err(|e| DeployError::failed(label, &e))?;
        // The nonce is spent once the node accepted the transaction.
        self.next_nonce += 1;

        tracing::debug!(
            step = label,
            %tx_hash,
            nonce = signed.request.nonce,
            gas_limit = signed.request.gas_limit,
            "Transaction sent"
        );

        let receipt = self.wait_for_receipt(label, tx_hash).await?;
        if !receipt.success {
            return Err(DeployError::DeploymentFailed {
                contract: label.to_string(),
                reason: format!("transaction {tx_hash} reverted"),
            });
        }
        Ok(receipt)
    }

    async fn build_request(
        &self,
        to: TxKind,
        input: Bytes,
        opts: &TxOptions,
    ) -> anyhow::Result<TransactionRequest> {
        let gas_limit = match opts.gas_limit {
            Some(limit) => limit,
            None => {
                let call = CallRequest {
                    from: opts.signer.address(),
                    to: match to {
                        TxKind::Create => None,
                        TxKind::Call(address) => Some(address),
                    },
                    input: input.clone(),
                };
                self.provider.estimate_gas(&call).await?
            }
        };
        let gas_price = self.provider.gas_price().await?;

        Ok(TransactionRequest {
            chain_id: self.chain_id,
            nonce: self.next_nonce,
            gas_price,
            gas_limit,
            to,
            value: U256::ZERO,
            input,
        })
    }

    async fn wait_for_receipt(&self, label: &str, tx_hash: B256) -> DeployResult<TransactionReceipt> {
        let provider = &self.provider;
        let ConfirmationPolicy {
            receipt_timeout,
            poll_interval,
        } = self.confirmation;

        match poll_until(receipt_timeout, poll_interval, move || {
            provider.transaction_receipt(tx_hash)
        })
        .await
        {
            Ok(Some(receipt)) => Ok(receipt),
            Ok(None) => Err(DeployError::TransactionTimeout {
                contract: label.to_string(),
                tx_hash,
                waited: receipt_timeout,
            }),
            Err(e) => Err(DeployError::failed(label, &e)),
        }
    }

    /// Deploy `artifact` and record its address on it.
    pub async fn deploy(
        &mut self,
        artifact: &ContractArtifact,
        artifacts: &impl ArtifactSource,
        opts: &TxOptions,
    ) -> DeployResult<Address> {
        let label = artifact.role().to_string();
        let init_code = artifact.init_code(artifacts)?;
        let receipt = self.submit(&label, TxKind::Create, init_code, opts).await?;
        let address = receipt
            .contract_address
            .ok_or_else(|| DeployError::DeploymentFailed {
                contract: label.clone(),
                reason: format!(
                    "receipt of {} has no contract address",
                    receipt.transaction_hash
                ),
            })?;
        artifact.assign(address)?;
        Ok(address)
    }

    /// Send a state-changing call to `to`.
    pub async fn call(
        &mut self,
        label: &str,
        to: Address,
        input: Bytes,
        opts: &TxOptions,
    ) -> DeployResult<TransactionReceipt> {
        self.submit(label, TxKind::Call(to), input, opts).await
    }
}

impl TokenHandle {
    pub async fn mint<P: Provider>(
        &self,
        session: &mut Session<P>,
        to: Address,
        amount: U256,
        opts: &TxOptions,
    ) -> DeployResult<TransactionReceipt> {
        session
            .call("Token.mint", self.address, Self::mint_input(to, amount), opts)
            .await
    }

    pub async fn transfer<P: Provider>(
        &self,
        session: &mut Session<P>,
        to: Address,
        amount: U256,
        opts: &TxOptions,
    ) -> DeployResult<TransactionReceipt> {
        session
            .call(
                "Token.transfer",
                self.address,
                Self::transfer_input(to, amount),
                opts,
            )
            .await
    }
}
