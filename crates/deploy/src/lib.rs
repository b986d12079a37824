//! ocean-deploy - Deployment library for the data-token and pool contracts.
//!
//! This crate deploys the data-token template and factory, the pool template and
//! factory, and on local chains a stand-in token funded to the test accounts.

mod account;
pub use account::{AccountHandle, DeploymentKey};

mod args;
pub use args::{ArgumentError, usage, validate_network_args};

pub mod bootstrap;
pub use bootstrap::{Recipient, TestDistribution, TestNetworkBootstrapper, to_base18};

pub mod config;
pub use config::{ConfigResolver, ProviderCredential, default_config_path};

pub mod connector;
pub use connector::{
    ConfirmationPolicy, ConnectionState, HttpProviderFactory, NetworkConnector, ProviderFactory,
};

pub mod contracts;
pub use contracts::{
    ArtifactDir, ArtifactSource, ConstructorArgs, ContractArtifact, ContractRole,
    StaticArtifacts, TokenHandle,
};

mod error;
pub use error::{DeployError, DeployResult};

pub mod metadata;
pub use metadata::{DeploymentRecords, FileRecords, MemoryRecords};

mod network;
pub use network::{ChainCategory, Endpoint, Network, NetworkProfile};

pub mod orchestrator;
pub use orchestrator::{DeployedContracts, DeploymentOrchestrator, DeploymentPlan};

pub mod pipeline;

mod report;
pub use report::DeploymentReport;

pub mod rpc;
pub use rpc::{CallRequest, HttpProvider, Provider, TransactionReceipt};

mod session;
pub use session::{Session, TxOptions};

pub mod tx;
pub use tx::{SignedTransaction, TransactionRequest, TxKind};
