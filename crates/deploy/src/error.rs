//! Error taxonomy for a deployment run.
//!
//! Every variant is terminal for the run. Nothing in this crate retries.

use std::time::Duration;

use alloy_core::primitives::B256;
use thiserror::Error;

use crate::args::ArgumentError;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    #[error("missing config value `{key}` in scope [{scope}]")]
    MissingConfig { scope: String, key: String },

    #[error("need valid {key}")]
    InvalidCredential { key: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("failed to connect to network `{network}`: {reason}")]
    Connection { network: String, reason: String },

    #[error("artifact for {contract} unavailable: {reason}")]
    Artifact { contract: String, reason: String },

    #[error("{step}: deployment metadata store failure: {reason}")]
    Metadata { step: String, reason: String },

    #[error("{contract}: transaction failed: {reason}")]
    DeploymentFailed { contract: String, reason: String },

    #[error("{contract}: transaction {tx_hash} not confirmed after {waited:?}")]
    TransactionTimeout {
        contract: String,
        tx_hash: B256,
        waited: Duration,
    },
}

impl DeployError {
    /// Name of the contract or step a transaction error is tagged with.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::DeploymentFailed { contract, .. }
            | Self::TransactionTimeout { contract, .. }
            | Self::Artifact { contract, .. } => Some(contract),
            Self::Metadata { step, .. } => Some(step),
            _ => None,
        }
    }

    pub(crate) fn failed(contract: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::DeploymentFailed {
            contract: contract.into(),
            reason: format!("{err:#}"),
        }
    }
}
