//! One deployment run, from resolved config to the printed report.

use crate::bootstrap::{TestDistribution, TestNetworkBootstrapper};
use crate::config::ConfigResolver;
use crate::connector::{NetworkConnector, ProviderFactory};
use crate::contracts::ArtifactSource;
use crate::error::DeployResult;
use crate::metadata::DeploymentRecords;
use crate::network::NetworkProfile;
use crate::orchestrator::DeploymentOrchestrator;
use crate::report::DeploymentReport;

/// Deploy everything to `profile` with the default test distribution.
pub async fn run<F, A, R>(
    profile: &NetworkProfile,
    config: &ConfigResolver,
    connector: &mut NetworkConnector<F>,
    artifacts: &A,
    records: &R,
) -> DeployResult<DeploymentReport>
where
    F: ProviderFactory,
    A: ArtifactSource,
    R: DeploymentRecords,
{
    run_with_distribution(
        profile,
        config,
        connector,
        artifacts,
        records,
        TestDistribution::default(),
    )
    .await
}

/// Deploy everything to `profile`.
///
/// Secrets and the test distribution are checked before any network I/O. The
/// stand-in token is only bootstrapped on local-ephemeral networks.
pub async fn run_with_distribution<F, A, R>(
    profile: &NetworkProfile,
    config: &ConfigResolver,
    connector: &mut NetworkConnector<F>,
    artifacts: &A,
    records: &R,
    distribution: TestDistribution,
) -> DeployResult<DeploymentReport>
where
    F: ProviderFactory,
    A: ArtifactSource,
    R: DeploymentRecords,
{
    let key = config.deployer_key(profile.name())?;
    tracing::info!(network = profile.name(), deployer = %key.account(), "Resolved deployer key");

    if profile.category().requires_provider_credential() {
        connector.inject_provider_credential(config.provider_credential()?);
    }

    let bootstrapper =
        TestNetworkBootstrapper::new(artifacts, records).with_distribution(distribution);
    let recipients = if profile.is_local_ephemeral() {
        bootstrapper.distribution().validate()?;
        bootstrapper.resolve_recipients(config, profile.name())?
    } else {
        Vec::new()
    };

    let mut session = connector.connect(profile, &key).await?;

    let deployed = DeploymentOrchestrator::new(artifacts, records)
        .run(&mut session)
        .await?;

    let token = if profile.is_local_ephemeral() {
        Some(bootstrapper.run(&mut session, &recipients).await?)
    } else {
        None
    };

    DeploymentReport::from_run(&deployed, token.as_ref())
}
