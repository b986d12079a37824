//! Validation of the single network argument.

use std::str::FromStr;

use thiserror::Error;

use crate::network::Network;

/// Why the positional arguments were rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("no network given")]
    MissingNetwork,

    #[error("Got {0} argument(s), need 1.")]
    WrongArity(usize),

    #[error("Invalid network. Supported networks: {}", Network::supported_names_str())]
    UnsupportedNetwork(String),
}

impl ArgumentError {
    /// Plain usage requests are not failures.
    pub fn is_help_request(&self) -> bool {
        matches!(self, Self::MissingNetwork)
    }
}

/// Usage text shown for every rejected invocation.
pub fn usage() -> String {
    format!(
        "Deploy DataTokenTemplate and more to a target network.\n\
         \n\
         Usage: deploy NETWORK\n  \
         NETWORK -- one of: {}\n",
        Network::supported_names_str()
    )
}

/// Check that exactly one supported network name was given.
pub fn validate_network_args<S: AsRef<str>>(args: &[S]) -> Result<Network, ArgumentError> {
    match args {
        [] => Err(ArgumentError::MissingNetwork),
        [name] => {
            let name = name.as_ref();
            Network::from_str(name).map_err(|_| ArgumentError::UnsupportedNetwork(name.to_string()))
        }
        _ => Err(ArgumentError::WrongArity(args.len())),
    }
}
