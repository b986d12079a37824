//! Stand-in token for local-ephemeral chains.
//!
//! Deploys a token on the template artifact, mints the whole cap to the
//! deployer and hands a fixed amount to each test account.

use alloy_core::primitives::{Address, U256};

use crate::config::{ConfigResolver, TEST_PRIVATE_KEY1, TEST_PRIVATE_KEY2};
use crate::contracts::{ArtifactSource, ConstructorArgs, ContractArtifact, ContractRole, TokenHandle};
use crate::error::{DeployError, DeployResult};
use crate::metadata::DeploymentRecords;
use crate::orchestrator::record_deployment;
use crate::rpc::Provider;
use crate::session::Session;

/// `amount * 10**18`.
pub fn to_base18(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}

/// Supply and distribution of the stand-in token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDistribution {
    pub name: String,
    pub symbol: String,
    pub cap: U256,
    /// Amount sent to each recipient.
    pub amount: U256,
    /// Config keys holding the recipients' private keys, in transfer order.
    pub recipients: Vec<String>,
}

impl Default for TestDistribution {
    fn default() -> Self {
        Self {
            name: "Ocean".to_string(),
            symbol: "OCEAN".to_string(),
            cap: to_base18(1_410_000_000),
            amount: to_base18(1000),
            recipients: vec![TEST_PRIVATE_KEY1.to_string(), TEST_PRIVATE_KEY2.to_string()],
        }
    }
}

impl TestDistribution {
    /// Sum of all transfers, `None` on overflow.
    pub fn total(&self) -> Option<U256> {
        self.amount.checked_mul(U256::from(self.recipients.len()))
    }

    /// The distribution must fit in the minted supply.
    pub fn validate(&self) -> DeployResult<()> {
        match self.total() {
            Some(total) if total <= self.cap => Ok(()),
            _ => Err(DeployError::Configuration(format!(
                "distributing {} to {} account(s) exceeds the token cap {}",
                self.amount,
                self.recipients.len(),
                self.cap
            ))),
        }
    }
}

/// A resolved transfer target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub label: String,
    pub address: Address,
}

pub struct TestNetworkBootstrapper<'a, A, R> {
    distribution: TestDistribution,
    artifacts: &'a A,
    records: &'a R,
}

impl<'a, A: ArtifactSource, R: DeploymentRecords> TestNetworkBootstrapper<'a, A, R> {
    pub fn new(artifacts: &'a A, records: &'a R) -> Self {
        Self {
            distribution: TestDistribution::default(),
            artifacts,
            records,
        }
    }

    pub fn with_distribution(mut self, distribution: TestDistribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn distribution(&self) -> &TestDistribution {
        &self.distribution
    }

    /// Derive each recipient's address from its configured key on `network`.
    pub fn resolve_recipients(
        &self,
        config: &ConfigResolver,
        network: &str,
    ) -> DeployResult<Vec<Recipient>> {
        self.distribution
            .recipients
            .iter()
            .map(|label| {
                let key = config.private_key(network, label)?;
                Ok(Recipient {
                    label: label.clone(),
                    address: key.address(),
                })
            })
            .collect()
    }

    /// Deploy, mint and distribute. Any failure aborts the remaining steps.
    pub async fn run<P: Provider>(
        &self,
        session: &mut Session<P>,
        recipients: &[Recipient],
    ) -> DeployResult<TokenHandle> {
        if !session.profile().is_local_ephemeral() {
            return Err(DeployError::InvalidState(format!(
                "refusing to bootstrap a test token on `{}` ({})",
                session.profile().name(),
                session.profile().category()
            )));
        }
        let distribution = &self.distribution;
        distribution.validate()?;
        if recipients.len() != distribution.recipients.len() {
            return Err(DeployError::InvalidState(format!(
                "expected {} recipient(s), got {}",
                distribution.recipients.len(),
                recipients.len()
            )));
        }

        let deployer = session.account();
        let opts = session.tx_options();

        tracing::info!(symbol = %distribution.symbol, cap = %distribution.cap, "Deploying test token...");
        let artifact = ContractArtifact::new(
            ContractRole::Token,
            ConstructorArgs::DataToken {
                name: distribution.name.clone(),
                symbol: distribution.symbol.clone(),
                minter: deployer.address(),
                cap: distribution.cap,
                blob: String::new(),
                fee_collector: deployer.address(),
            },
        );
        let token = TokenHandle::new(session.deploy(&artifact, self.artifacts, &opts).await?);
        record_deployment(self.records, session.profile(), session.chain_id(), &artifact);
        tracing::info!(address = %token.address, "Test token deployed");

        token
            .mint(session, deployer.address(), distribution.cap, &opts)
            .await?;
        tracing::info!(to = %deployer, amount = %distribution.cap, "Minted test token supply");

        for recipient in recipients {
            token
                .transfer(session, recipient.address, distribution.amount, &opts)
                .await?;
            tracing::info!(
                recipient = %recipient.label,
                to = %recipient.address,
                amount = %distribution.amount,
                "Distributed test token"
            );
        }

        Ok(token)
    }
}
