//! Ordered deployment of the contract set.
//!
//! Steps run one at a time through the session. A step's constructor only ever
//! sees addresses of steps that already confirmed.

use alloy_core::primitives::{Address, U256};

use crate::account::AccountHandle;
use crate::contracts::{ArtifactSource, ConstructorArgs, ContractArtifact, ContractRole};
use crate::error::{DeployError, DeployResult};
use crate::metadata::DeploymentRecords;
use crate::network::NetworkProfile;
use crate::rpc::Provider;
use crate::session::Session;

/// Supply cap of the data-token template, `2**255`.
pub fn template_cap() -> U256 {
    U256::from(1) << 255
}

/// One deployment step and the step it waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentStep {
    pub role: ContractRole,
    pub depends_on: Option<ContractRole>,
}

impl From<ContractRole> for DeploymentStep {
    fn from(role: ContractRole) -> Self {
        Self {
            role,
            depends_on: role.depends_on(),
        }
    }
}

/// Validated order of deployment steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    steps: Vec<DeploymentStep>,
}

impl DeploymentPlan {
    /// Template, Factory, PoolTemplate, PoolFactory.
    pub fn standard() -> Self {
        Self {
            steps: [
                ContractRole::Template,
                ContractRole::Factory,
                ContractRole::PoolTemplate,
                ContractRole::PoolFactory,
            ]
            .into_iter()
            .map(DeploymentStep::from)
            .collect(),
        }
    }

    /// Build a plan from `roles` in execution order.
    ///
    /// Every role appears at most once, after the role it depends on. The
    /// stand-in token is not part of a plan.
    pub fn new(roles: impl IntoIterator<Item = ContractRole>) -> DeployResult<Self> {
        let mut steps: Vec<DeploymentStep> = Vec::new();
        for role in roles {
            if role == ContractRole::Token {
                return Err(DeployError::Configuration(format!(
                    "{role} is deployed by the test network bootstrapper, not a plan"
                )));
            }
            if steps.iter().any(|s| s.role == role) {
                return Err(DeployError::Configuration(format!(
                    "{role} appears twice in the deployment plan"
                )));
            }
            let step = DeploymentStep::from(role);
            if let Some(dependency) = step.depends_on {
                if !steps.iter().any(|s| s.role == dependency) {
                    return Err(DeployError::Configuration(format!(
                        "{role} must be deployed after {dependency}"
                    )));
                }
            }
            steps.push(step);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }
}

impl Default for DeploymentPlan {
    fn default() -> Self {
        Self::standard()
    }
}

/// Artifacts of a finished run, in execution order.
#[derive(Debug, Default)]
pub struct DeployedContracts {
    artifacts: Vec<ContractArtifact>,
}

impl DeployedContracts {
    pub fn get(&self, role: ContractRole) -> Option<&ContractArtifact> {
        self.artifacts.iter().find(|a| a.role() == role)
    }

    /// Confirmed address of `role`, if it was deployed.
    pub fn address(&self, role: ContractRole) -> Option<Address> {
        self.get(role).and_then(ContractArtifact::address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContractArtifact> {
        self.artifacts.iter()
    }
}

/// Constructor arguments of `role`, given the confirmed address of its dependency.
pub fn constructor_args(
    role: ContractRole,
    deployer: AccountHandle,
    dependency: Option<Address>,
) -> DeployResult<ConstructorArgs> {
    let required = || {
        dependency.ok_or_else(|| {
            DeployError::InvalidState(format!(
                "{role} needs the address of {}, which is not deployed",
                role.depends_on()
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            ))
        })
    };

    Ok(match role {
        ContractRole::Template => ConstructorArgs::DataToken {
            name: "Template".to_string(),
            symbol: "TEM".to_string(),
            minter: deployer.address(),
            cap: template_cap(),
            blob: "blob".to_string(),
            fee_collector: deployer.address(),
        },
        ContractRole::Factory => ConstructorArgs::DataTokenFactory {
            template: required()?,
            fee_collector: deployer.address(),
        },
        ContractRole::PoolTemplate => ConstructorArgs::Empty,
        ContractRole::PoolFactory => ConstructorArgs::PoolFactory {
            pool_template: required()?,
        },
        ContractRole::Token => {
            return Err(DeployError::InvalidState(format!(
                "{role} has no fixed constructor arguments"
            )));
        }
    })
}

/// Step name of the local record reset, used to tag its failure.
pub const RESET_RECORDS_STEP: &str = "reset records";

/// Cache a confirmed deployment of a local-ephemeral chain under its artifact name.
///
/// Best effort: the contract is already on chain, so a failed write only warns.
pub(crate) fn record_deployment(
    records: &impl DeploymentRecords,
    profile: &NetworkProfile,
    chain_id: u64,
    artifact: &ContractArtifact,
) {
    if !profile.is_local_ephemeral() {
        return;
    }
    let Some(address) = artifact.address() else {
        return;
    };
    if let Err(error) = records.record(chain_id, artifact.role().artifact_name(), address) {
        tracing::warn!(
            contract = %artifact.role(),
            %address,
            error = ?error,
            "Failed to cache deployment record"
        );
    }
}

/// Runs a [`DeploymentPlan`] through a session.
pub struct DeploymentOrchestrator<'a, A, R> {
    plan: DeploymentPlan,
    artifacts: &'a A,
    records: &'a R,
}

impl<'a, A: ArtifactSource, R: DeploymentRecords> DeploymentOrchestrator<'a, A, R> {
    pub fn new(artifacts: &'a A, records: &'a R) -> Self {
        Self {
            plan: DeploymentPlan::standard(),
            artifacts,
            records,
        }
    }

    pub fn with_plan(mut self, plan: DeploymentPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn plan(&self) -> &DeploymentPlan {
        &self.plan
    }

    /// Deploy every step in order, stopping at the first failure.
    ///
    /// Contracts confirmed before a failure stay on chain.
    pub async fn run<P: Provider>(
        &self,
        session: &mut Session<P>,
    ) -> DeployResult<DeployedContracts> {
        let chain_id = session.chain_id();

        if session.profile().is_local_ephemeral() {
            self.records
                .reset(chain_id)
                .map_err(|e| DeployError::Metadata {
                    step: RESET_RECORDS_STEP.to_string(),
                    reason: format!("{e:#}"),
                })?;
            tracing::info!(chain_id, "Cleared cached deployment records");
        }

        let deployer = session.account();
        let opts = session.tx_options();
        let mut deployed = DeployedContracts::default();

        for step in self.plan.steps() {
            let dependency = step.depends_on.and_then(|d| deployed.address(d));
            let artifact =
                ContractArtifact::new(step.role, constructor_args(step.role, deployer, dependency)?);

            tracing::info!(
                contract = %step.role,
                artifact = step.role.artifact_name(),
                "Deploying..."
            );
            let address = session.deploy(&artifact, self.artifacts, &opts).await?;
            tracing::info!(contract = %step.role, %address, "Deployed");

            record_deployment(self.records, session.profile(), chain_id, &artifact);
            deployed.artifacts.push(artifact);
        }

        Ok(deployed)
    }
}
