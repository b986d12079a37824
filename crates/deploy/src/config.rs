//! Per-network secrets and settings.
//!
//! The store is a TOML file of sections, one per network plus a shared `[DEFAULT]`
//! section, overlaid with `OCEAN_CONF_<SECTION>__<KEY>` environment variables:
//!
//! ```toml
//! [DEFAULT]
//! WEB3_INFURA_PROJECT_ID = "..."
//!
//! [ganache]
//! FACTORY_DEPLOYER_PRIVATE_KEY = "0x..."
//! TEST_PRIVATE_KEY1 = "0x..."
//! TEST_PRIVATE_KEY2 = "0x..."
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;

use crate::account::DeploymentKey;
use crate::error::{DeployError, DeployResult};

/// Name of the section shared by every network.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Default config file name, looked up in the home directory.
pub const CONFIG_FILENAME: &str = "ocean.toml";

/// Prefix of environment variables overriding config values.
pub const ENV_PREFIX: &str = "OCEAN_CONF_";

pub const FACTORY_DEPLOYER_PRIVATE_KEY: &str = "FACTORY_DEPLOYER_PRIVATE_KEY";
pub const WEB3_INFURA_PROJECT_ID: &str = "WEB3_INFURA_PROJECT_ID";
pub const TEST_PRIVATE_KEY1: &str = "TEST_PRIVATE_KEY1";
pub const TEST_PRIVATE_KEY2: &str = "TEST_PRIVATE_KEY2";

/// Shortest string accepted as key material.
pub const MIN_KEY_LENGTH: usize = 10;

/// Default location of the config file (`~/ocean.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILENAME))
}

/// A config value as parsed by figment. Env overrides may come back as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Int(i) => write!(f, "{i}"),
            RawValue::Float(x) => write!(f, "{x}"),
            RawValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Hosted-node credential for production and public-test networks.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential(String);

impl ProviderCredential {
    /// Environment variable the credential is exported under.
    pub const ENV_VAR: &'static str = WEB3_INFURA_PROJECT_ID;

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderCredential(<redacted>)")
    }
}

/// Lookup of `(scope, key)` pairs. Pure, no side effects after loading.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ConfigResolver {
    /// Load the config file at `path` (missing file means empty) plus env overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let resolver = Self::from_figment(&figment)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            sections = resolver.sections.len(),
            "Configuration loaded"
        );
        Ok(resolver)
    }

    pub fn from_figment(figment: &Figment) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, RawValue>> = figment
            .extract()
            .context("Config must be a table of sections of string values")?;
        Ok(Self::from_sections(raw.into_iter().map(|(section, values)| {
            (
                section,
                values
                    .into_iter()
                    .map(|(key, value)| (key, value.to_string()))
                    .collect::<Vec<_>>(),
            )
        })))
    }

    /// Build a resolver from in-memory sections.
    ///
    /// Section names are matched case-insensitively and keys are upper-cased,
    /// so `[Ganache] factory_deployer_private_key` and
    /// `[ganache] FACTORY_DEPLOYER_PRIVATE_KEY` are the same entry.
    pub fn from_sections<S, K, V, I>(sections: impl IntoIterator<Item = (S, I)>) -> Self
    where
        S: AsRef<str>,
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut resolver = Self::default();
        for (section, values) in sections {
            let entry = resolver
                .sections
                .entry(section_key(section.as_ref()))
                .or_default();
            for (key, value) in values {
                entry.insert(key.as_ref().to_uppercase(), value.into());
            }
        }
        resolver
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(&section_key(section))
            .and_then(|values| values.get(&key.to_uppercase()))
            .map(String::as_str)
    }

    /// Resolve `key` for `network`, inheriting from `[DEFAULT]`.
    pub fn resolve(&self, network: &str, key: &str) -> DeployResult<&str> {
        self.lookup(network, key)
            .or_else(|| self.lookup(DEFAULT_SECTION, key))
            .ok_or_else(|| DeployError::MissingConfig {
                scope: network.to_string(),
                key: key.to_string(),
            })
    }

    /// Resolve a cross-network `key` from `[DEFAULT]` only.
    pub fn resolve_default(&self, key: &str) -> DeployResult<&str> {
        self.lookup(DEFAULT_SECTION, key)
            .ok_or_else(|| DeployError::MissingConfig {
                scope: DEFAULT_SECTION.to_string(),
                key: key.to_string(),
            })
    }

    /// Heuristic format check for key material.
    pub fn validate_key_format(secret: &str) -> bool {
        secret.trim().len() >= MIN_KEY_LENGTH
    }

    /// Resolve and check a private key stored under `key`.
    pub fn private_key(&self, network: &str, key: &str) -> DeployResult<DeploymentKey> {
        let secret = self.resolve(network, key)?;
        if !Self::validate_key_format(secret) {
            return Err(DeployError::InvalidCredential {
                key: key.to_string(),
            });
        }
        DeploymentKey::parse(key, secret)
    }

    /// The key that signs every transaction of a run on `network`.
    pub fn deployer_key(&self, network: &str) -> DeployResult<DeploymentKey> {
        self.private_key(network, FACTORY_DEPLOYER_PRIVATE_KEY)
    }

    /// The hosted-node credential. Absence is a configuration error.
    pub fn provider_credential(&self) -> DeployResult<ProviderCredential> {
        match self.resolve_default(WEB3_INFURA_PROJECT_ID) {
            Ok(value) if !value.trim().is_empty() => Ok(ProviderCredential::new(value.trim())),
            Ok(_) | Err(DeployError::MissingConfig { .. }) => Err(DeployError::Configuration(
                format!("{WEB3_INFURA_PROJECT_ID} must be set in [{DEFAULT_SECTION}]"),
            )),
            Err(e) => Err(e),
        }
    }
}

fn section_key(section: &str) -> String {
    if section.eq_ignore_ascii_case(DEFAULT_SECTION) {
        DEFAULT_SECTION.to_string()
    } else {
        section.to_lowercase()
    }
}
