use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ocean_deploy::ConfirmationPolicy;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "deploy")]
#[command(
    author,
    version,
    about = "Deploy DataTokenTemplate and more to a target network"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "OCEAN_DEPLOY_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the config file holding keys and the provider credential.
    ///
    /// Defaults to `~/ocean.toml`.
    #[arg(short, long, env = "OCEAN_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory of compiled contract artifacts (`<Contract>.json`).
    #[arg(long, env = "OCEAN_DEPLOY_ARTIFACTS", default_value = "build/contracts")]
    pub artifacts: PathBuf,

    /// Directory of cached deployment records.
    #[arg(long, env = "OCEAN_DEPLOY_DEPLOYMENTS", default_value = "build/deployments")]
    pub deployments: PathBuf,

    /// Seconds to wait for each transaction to be mined.
    #[arg(long, env = "OCEAN_DEPLOY_RECEIPT_TIMEOUT", default_value_t = 120)]
    pub receipt_timeout: u64,

    /// Milliseconds between receipt polls.
    #[arg(long, env = "OCEAN_DEPLOY_POLL_INTERVAL", default_value_t = 1000)]
    pub poll_interval: u64,

    /// The target network. Exactly one is expected.
    ///
    /// Hyphenated and unknown tokens land here too, so every malformed
    /// invocation is rejected with the usage text.
    #[arg(value_name = "NETWORK", allow_hyphen_values = true, trailing_var_arg = true)]
    pub networks: Vec<String>,
}

impl Cli {
    pub fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            receipt_timeout: Duration::from_secs(self.receipt_timeout),
            poll_interval: Duration::from_millis(self.poll_interval),
        }
    }
}
