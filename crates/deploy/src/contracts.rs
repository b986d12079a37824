//! Contract kinds, their compiled artifacts and ABI encoding.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use alloy_core::primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolConstructor, sol};
use anyhow::Context;
use serde::Deserialize;

use crate::error::{DeployError, DeployResult};

sol! {
    /// Data-token template, also deployed as the stand-in token.
    contract DataTokenTemplate {
        constructor(
            string name,
            string symbol,
            address minter,
            uint256 cap,
            string blob,
            address feeCollector
        );

        function mint(address account, uint256 value) external;
        function transfer(address to, uint256 value) external returns (bool);
    }

    contract DTFactory {
        constructor(address template, address collector);
    }

    contract BFactory {
        constructor(address bpoolTemplate);
    }
}

/// The role a contract plays in a deployment run.
///
/// The role's name is what failures are tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
pub enum ContractRole {
    Template,
    Factory,
    PoolTemplate,
    PoolFactory,
    /// Stand-in fungible token on local-ephemeral networks.
    Token,
}

impl ContractRole {
    /// Name of the compiled artifact backing this role.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractRole::Template | ContractRole::Token => "DataTokenTemplate",
            ContractRole::Factory => "DTFactory",
            ContractRole::PoolTemplate => "BPool",
            ContractRole::PoolFactory => "BFactory",
        }
    }

    /// The role whose address this role's constructor takes.
    pub fn depends_on(&self) -> Option<ContractRole> {
        match self {
            ContractRole::Factory => Some(ContractRole::Template),
            ContractRole::PoolFactory => Some(ContractRole::PoolTemplate),
            _ => None,
        }
    }
}

/// Typed constructor arguments, one shape per contract kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorArgs {
    /// `BPool()`.
    Empty,
    /// `DataTokenTemplate(string,string,address,uint256,string,address)`.
    DataToken {
        name: String,
        symbol: String,
        minter: Address,
        cap: U256,
        blob: String,
        fee_collector: Address,
    },
    /// `DTFactory(address,address)`.
    DataTokenFactory {
        template: Address,
        fee_collector: Address,
    },
    /// `BFactory(address)`.
    PoolFactory { pool_template: Address },
}

impl ConstructorArgs {
    /// ABI-encoded arguments, appended to the init code.
    pub fn abi_encode(&self) -> Vec<u8> {
        match self {
            ConstructorArgs::Empty => Vec::new(),
            ConstructorArgs::DataToken {
                name,
                symbol,
                minter,
                cap,
                blob,
                fee_collector,
            } => DataTokenTemplate::constructorCall {
                name: name.clone(),
                symbol: symbol.clone(),
                minter: *minter,
                cap: *cap,
                blob: blob.clone(),
                feeCollector: *fee_collector,
            }
            .abi_encode(),
            ConstructorArgs::DataTokenFactory {
                template,
                fee_collector,
            } => DTFactory::constructorCall {
                template: *template,
                collector: *fee_collector,
            }
            .abi_encode(),
            ConstructorArgs::PoolFactory { pool_template } => BFactory::constructorCall {
                bpoolTemplate: *pool_template,
            }
            .abi_encode(),
        }
    }
}

/// A contract to deploy in this run. Its address is written once, on confirmation.
#[derive(Debug)]
pub struct ContractArtifact {
    role: ContractRole,
    args: ConstructorArgs,
    address: OnceLock<Address>,
}

impl ContractArtifact {
    pub fn new(role: ContractRole, args: ConstructorArgs) -> Self {
        Self {
            role,
            args,
            address: OnceLock::new(),
        }
    }

    pub fn role(&self) -> ContractRole {
        self.role
    }

    pub fn args(&self) -> &ConstructorArgs {
        &self.args
    }

    pub fn address(&self) -> Option<Address> {
        self.address.get().copied()
    }

    /// Record the confirmed address. A second assignment is a state error.
    pub fn assign(&self, address: Address) -> DeployResult<()> {
        self.address.set(address).map_err(|_| {
            DeployError::InvalidState(format!("{} was already deployed in this run", self.role))
        })
    }

    /// Init code: bytecode followed by the encoded constructor arguments.
    pub fn init_code(&self, artifacts: &impl ArtifactSource) -> DeployResult<Bytes> {
        let name = self.role.artifact_name();
        let mut code = artifacts
            .bytecode(name)
            .map_err(|e| DeployError::Artifact {
                contract: self.role.to_string(),
                reason: format!("{e:#}"),
            })?
            .to_vec();
        code.extend(self.args.abi_encode());
        Ok(code.into())
    }
}

/// Where compiled bytecode comes from.
pub trait ArtifactSource: Send + Sync {
    fn bytecode(&self, contract_name: &str) -> anyhow::Result<Bytes>;
}

#[derive(Debug, Deserialize)]
struct CompiledArtifact {
    bytecode: String,
}

/// Reads `<dir>/<ContractName>.json` build outputs.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSource for ArtifactDir {
    fn bytecode(&self, contract_name: &str) -> anyhow::Result<Bytes> {
        let path = self.dir.join(format!("{contract_name}.json"));
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let artifact: CompiledArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;
        decode_bytecode(&artifact.bytecode)
            .with_context(|| format!("Invalid bytecode in {}", path.display()))
    }
}

fn decode_bytecode(code: &str) -> anyhow::Result<Bytes> {
    let code = code.trim();
    let code = code.strip_prefix("0x").unwrap_or(code);
    if code.is_empty() {
        anyhow::bail!("bytecode is empty, is the contract abstract?");
    }
    Ok(hex::decode(code).context("bytecode is not hex (unlinked library?)")?.into())
}

/// Bytecode held in memory, keyed by contract name.
#[derive(Debug, Clone, Default)]
pub struct StaticArtifacts {
    bytecode: HashMap<String, Bytes>,
}

impl StaticArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, contract_name: impl Into<String>, bytecode: impl Into<Bytes>) -> Self {
        self.bytecode.insert(contract_name.into(), bytecode.into());
        self
    }
}

impl ArtifactSource for StaticArtifacts {
    fn bytecode(&self, contract_name: &str) -> anyhow::Result<Bytes> {
        self.bytecode
            .get(contract_name)
            .cloned()
            .with_context(|| format!("No bytecode for {contract_name}"))
    }
}

/// Handle to a deployed fungible token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHandle {
    pub address: Address,
}

impl TokenHandle {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn mint_input(to: Address, amount: U256) -> Bytes {
        DataTokenTemplate::mintCall {
            account: to,
            value: amount,
        }
        .abi_encode()
        .into()
    }

    pub fn transfer_input(to: Address, amount: U256) -> Bytes {
        DataTokenTemplate::transferCall { to, value: amount }
            .abi_encode()
            .into()
    }
}
