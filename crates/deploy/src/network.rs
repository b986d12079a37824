//! Supported networks and their resolved profiles.

use strum::IntoEnumIterator;
use url::Url;

use crate::error::{DeployError, DeployResult};

/// Names reserved for simulation harnesses that silently discard state.
pub const RESERVED_NETWORK_NAMES: &[&str] = &["development"];

/// Default RPC endpoint of a local ganache node.
pub const GANACHE_RPC_URL: &str = "http://127.0.0.1:8545";

/// The class of chain a network belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ChainCategory {
    Production,
    PublicTest,
    LocalEphemeral,
}

impl ChainCategory {
    /// Whether the endpoint is a hosted node that needs a provider credential.
    pub fn requires_provider_credential(&self) -> bool {
        matches!(self, Self::Production | Self::PublicTest)
    }
}

/// The fixed set of networks this tool deploys to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Network {
    Ganache,
    Rinkeby,
    Main,
}

impl Network {
    pub fn category(&self) -> ChainCategory {
        match self {
            Network::Ganache => ChainCategory::LocalEphemeral,
            Network::Rinkeby => ChainCategory::PublicTest,
            Network::Main => ChainCategory::Production,
        }
    }

    /// All supported network names, in declaration order.
    pub fn supported_names() -> Vec<&'static str> {
        Network::iter().map(<&'static str>::from).collect()
    }

    /// Comma separated list of the supported names, as shown in usage text.
    pub fn supported_names_str() -> String {
        Self::supported_names()
            .iter()
            .map(|n| format!("'{n}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn infura_host(&self) -> Option<&'static str> {
        match self {
            Network::Ganache => None,
            Network::Rinkeby => Some("rinkeby.infura.io"),
            Network::Main => Some("mainnet.infura.io"),
        }
    }

    /// Resolve the profile used to connect to this network.
    pub fn profile(&self) -> NetworkProfile {
        let endpoint = match self.infura_host() {
            Some(host) => Endpoint::Hosted {
                base: format!("https://{host}/v3/"),
            },
            None => Endpoint::Direct(GANACHE_RPC_URL.to_string()),
        };
        NetworkProfile {
            name: self.to_string(),
            category: self.category(),
            endpoint,
        }
    }
}

/// How a network's RPC endpoint is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A fixed URL.
    Direct(String),
    /// A hosted node; the provider credential is appended to `base`.
    Hosted { base: String },
}

/// A resolved target network. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    name: String,
    category: ChainCategory,
    endpoint: Endpoint,
}

impl NetworkProfile {
    /// Build a profile for an arbitrary network name.
    ///
    /// Used for custom endpoints and in tests; [`Network::profile`] covers the supported set.
    pub fn new(name: impl Into<String>, category: ChainCategory, endpoint: Endpoint) -> Self {
        Self {
            name: name.into(),
            category,
            endpoint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> ChainCategory {
        self.category
    }

    pub fn is_local_ephemeral(&self) -> bool {
        self.category == ChainCategory::LocalEphemeral
    }

    pub fn is_reserved(&self) -> bool {
        RESERVED_NETWORK_NAMES.contains(&self.name.as_str())
    }

    /// Derive the RPC URL, using `credential` for hosted endpoints.
    pub fn rpc_url(&self, credential: Option<&str>) -> DeployResult<Url> {
        let raw = match &self.endpoint {
            Endpoint::Direct(url) => url.clone(),
            Endpoint::Hosted { base } => {
                let credential = credential.ok_or_else(|| {
                    DeployError::Configuration(format!(
                        "network `{}` needs a provider credential",
                        self.name
                    ))
                })?;
                format!("{base}{credential}")
            }
        };
        Url::parse(&raw).map_err(|e| {
            DeployError::Configuration(format!("invalid RPC URL for `{}`: {e}", self.name))
        })
    }
}
