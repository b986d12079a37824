//! Cached deployment records, keyed by chain id.
//!
//! Records only mirror what was deployed; resetting them does not touch chain state.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use alloy_core::primitives::Address;
use anyhow::Context;

/// File name of the per-chain record map.
pub const MAP_FILENAME: &str = "map.json";

/// Store of addresses deployed per chain, newest first.
pub trait DeploymentRecords: Send + Sync {
    /// Forget every record of `chain_id`.
    fn reset(&self, chain_id: u64) -> anyhow::Result<()>;

    fn record(&self, chain_id: u64, contract: &str, address: Address) -> anyhow::Result<()>;

    fn addresses(&self, chain_id: u64, contract: &str) -> anyhow::Result<Vec<Address>>;
}

type RecordMap = BTreeMap<String, Vec<Address>>;

/// Records kept as `<root>/<chain_id>/map.json`.
#[derive(Debug, Clone)]
pub struct FileRecords {
    root: PathBuf,
}

impl FileRecords {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn chain_dir(&self, chain_id: u64) -> PathBuf {
        self.root.join(chain_id.to_string())
    }

    fn load(&self, path: &Path) -> anyhow::Result<RecordMap> {
        if !path.exists() {
            return Ok(RecordMap::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read deployment records from {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse deployment records JSON")
    }
}

impl DeploymentRecords for FileRecords {
    fn reset(&self, chain_id: u64) -> anyhow::Result<()> {
        let dir = self.chain_dir(chain_id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
            tracing::info!(chain_id, path = %dir.display(), "Cleared deployment records");
        }
        Ok(())
    }

    fn record(&self, chain_id: u64, contract: &str, address: Address) -> anyhow::Result<()> {
        let dir = self.chain_dir(chain_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(MAP_FILENAME);

        let mut map = self.load(&path)?;
        map.entry(contract.to_string()).or_default().insert(0, address);

        let json = serde_json::to_string_pretty(&map)
            .context("Failed to serialize deployment records")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write deployment records to {}", path.display()))?;
        Ok(())
    }

    fn addresses(&self, chain_id: u64, contract: &str) -> anyhow::Result<Vec<Address>> {
        let map = self.load(&self.chain_dir(chain_id).join(MAP_FILENAME))?;
        Ok(map.get(contract).cloned().unwrap_or_default())
    }
}

/// Records held in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    chains: Mutex<HashMap<u64, RecordMap>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeploymentRecords for MemoryRecords {
    fn reset(&self, chain_id: u64) -> anyhow::Result<()> {
        self.chains
            .lock()
            .map_err(|_| anyhow::anyhow!("records lock poisoned"))?
            .remove(&chain_id);
        Ok(())
    }

    fn record(&self, chain_id: u64, contract: &str, address: Address) -> anyhow::Result<()> {
        self.chains
            .lock()
            .map_err(|_| anyhow::anyhow!("records lock poisoned"))?
            .entry(chain_id)
            .or_default()
            .entry(contract.to_string())
            .or_default()
            .insert(0, address);
        Ok(())
    }

    fn addresses(&self, chain_id: u64, contract: &str) -> anyhow::Result<Vec<Address>> {
        Ok(self
            .chains
            .lock()
            .map_err(|_| anyhow::anyhow!("records lock poisoned"))?
            .get(&chain_id)
            .and_then(|map| map.get(contract))
            .cloned()
            .unwrap_or_default())
    }
}
