//! deploy pushes the data-token and pool contracts to one network and prints
//! the addresses to put in the downstream config.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use ocean_deploy::{
    ArgumentError, ArtifactDir, ConfigResolver, DeployError, DeploymentReport, FileRecords,
    HttpProviderFactory, Network, NetworkConnector, ProviderCredential, default_config_path,
    pipeline, usage, validate_network_args,
};

/// Exit code of a rejected invocation.
const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger. Stdout is reserved for the report.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    let network = match validate_network_args(&cli.networks) {
        Ok(network) => network,
        Err(err) if err.is_help_request() => {
            println!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Err(err) => return reject(&err),
    };

    match run(&cli, network) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<DeployError>() {
                Some(DeployError::InvalidArgument(arg_err)) => return reject(arg_err),
                Some(deploy_err) => match deploy_err.failed_step() {
                    Some(step) => tracing::error!(step, "Deployment aborted"),
                    None => tracing::error!("Deployment not started"),
                },
                None => {}
            }
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn reject(err: &ArgumentError) -> ExitCode {
    eprintln!("{}", usage());
    eprintln!("{err}");
    ExitCode::from(EXIT_USAGE)
}

fn run(cli: &Cli, network: Network) -> Result<DeploymentReport> {
    let config_path = cli
        .config
        .clone()
        .or_else(default_config_path)
        .context("Could not locate the home directory, pass --config")?;
    let config = ConfigResolver::load(&config_path)?;

    tracing::info!(
        %network,
        category = %network.category(),
        config_path = %config_path.display(),
        "Arguments parsed"
    );

    if network.category().requires_provider_credential() {
        let credential = config.provider_credential()?;
        // SAFETY: no runtime has been started yet, the process is single threaded.
        unsafe { std::env::set_var(ProviderCredential::ENV_VAR, credential.expose()) };
    }

    let artifacts = ArtifactDir::new(cli.artifacts.clone());
    let records = FileRecords::new(cli.deployments.clone());
    let mut connector = NetworkConnector::new(HttpProviderFactory).confirmation(cli.confirmation());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let report = runtime.block_on(pipeline::run(
        &network.profile(),
        &config,
        &mut connector,
        &artifacts,
        &records,
    ))?;
    Ok(report)
}
