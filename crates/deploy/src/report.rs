//! Final address block printed after a successful run.

use std::fmt;

use alloy_core::primitives::Address;

use crate::contracts::{ContractRole, TokenHandle};
use crate::error::{DeployError, DeployResult};
use crate::orchestrator::DeployedContracts;

pub const REPORT_HEADER: &str = "****Things to update in ~/ocean.conf****";

/// Addresses to copy into the downstream config, in print order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentReport {
    pub factory: Address,
    pub pool_factory: Address,
    /// Only set on local-ephemeral networks.
    pub token: Option<Address>,
}

impl DeploymentReport {
    pub fn new(factory: Address, pool_factory: Address, token: Option<Address>) -> Self {
        Self {
            factory,
            pool_factory,
            token,
        }
    }

    /// Collect the report from a finished run.
    pub fn from_run(
        deployed: &DeployedContracts,
        token: Option<&TokenHandle>,
    ) -> DeployResult<Self> {
        let address = |role: ContractRole| {
            deployed.address(role).ok_or_else(|| {
                DeployError::InvalidState(format!("{role} has no address to report"))
            })
        };
        Ok(Self::new(
            address(ContractRole::Factory)?,
            address(ContractRole::PoolFactory)?,
            token.map(|t| t.address),
        ))
    }

    /// `(KEY, address)` pairs: Factory, PoolFactory, then the token if any.
    pub fn entries(&self) -> Vec<(&'static str, Address)> {
        let mut entries = vec![
            ("DTFACTORY_ADDRESS", self.factory),
            ("BFACTORY_ADDRESS", self.pool_factory),
        ];
        if let Some(token) = self.token {
            entries.push(("OCEAN_ADDRESS", token));
        }
        entries
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REPORT_HEADER}")?;
        for (key, address) in self.entries() {
            write!(f, "\n{key} = {address}")?;
        }
        Ok(())
    }
}
