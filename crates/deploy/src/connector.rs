//! Connection session to the target chain.
//!
//! A connector goes `Disconnected -> Connecting -> Connected` once per process.
//! The [`Session`] it hands out is the only way to reach the chain.

use std::time::Duration;

use url::Url;

use crate::account::DeploymentKey;
use crate::config::ProviderCredential;
use crate::error::{DeployError, DeployResult};
use crate::network::NetworkProfile;
use crate::rpc::{HttpProvider, Provider};
use crate::session::Session;

/// Default time to wait for a transaction to be mined.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Opens a [`Provider`] for an RPC endpoint.
pub trait ProviderFactory {
    type Provider: Provider;

    fn open(&self, url: &Url) -> anyhow::Result<Self::Provider>;
}

/// Opens [`HttpProvider`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    type Provider = HttpProvider;

    fn open(&self, url: &Url) -> anyhow::Result<HttpProvider> {
        HttpProvider::new(url.clone())
    }
}

/// Transaction confirmation settings applied to every transaction of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct NetworkConnector<F> {
    factory: F,
    state: ConnectionState,
    credential: Option<ProviderCredential>,
    confirmation: ConfirmationPolicy,
}

impl<F: ProviderFactory> NetworkConnector<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: ConnectionState::Disconnected,
            credential: None,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    pub fn confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Provide the hosted-node credential for production and public-test networks.
    pub fn inject_provider_credential(&mut self, credential: ProviderCredential) {
        self.credential = Some(credential);
    }

    /// Connect to `profile`, signing with `key` for the rest of the process.
    pub async fn connect(
        &mut self,
        profile: &NetworkProfile,
        key: &DeploymentKey,
    ) -> DeployResult<Session<F::Provider>> {
        if self.state == ConnectionState::Connected {
            return Err(DeployError::InvalidState(format!(
                "already connected, refusing to connect to `{}`",
                profile.name()
            )));
        }
        if profile.is_reserved() {
            return Err(DeployError::Configuration(format!(
                "can't use network `{}`: it is reserved for a test harness that discards state",
                profile.name()
            )));
        }
        if profile.category().requires_provider_credential() && self.credential.is_none() {
            return Err(DeployError::Configuration(format!(
                "network `{}` is {} and needs a provider credential",
                profile.name(),
                profile.category()
            )));
        }

        let url = profile.rpc_url(self.credential.as_ref().map(ProviderCredential::expose))?;

        self.state = ConnectionState::Connecting;
        tracing::info!(network = profile.name(), category = %profile.category(), "Connecting...");

        match self.open_session(profile, &url, key).await {
            Ok(session) => {
                self.state = ConnectionState::Connected;
                tracing::info!(
                    network = profile.name(),
                    chain_id = session.chain_id(),
                    deployer = %session.account(),
                    nonce = session.next_nonce(),
                    "Connected"
                );
                Ok(session)
            }
            Err(reason) => {
                self.state = ConnectionState::Disconnected;
                Err(DeployError::Connection {
                    network: profile.name().to_string(),
                    reason: format!("{reason:#}"),
                })
            }
        }
    }

    async fn open_session(
        &self,
        profile: &NetworkProfile,
        url: &Url,
        key: &DeploymentKey,
    ) -> anyhow::Result<Session<F::Provider>> {
        let provider = self.factory.open(url)?;
        let chain_id = provider.chain_id().await?;
        let nonce = provider.transaction_count(key.address()).await?;
        Ok(Session::new(
            profile.clone(),
            chain_id,
            provider,
            key.clone(),
            nonce,
            self.confirmation,
        ))
    }
}
