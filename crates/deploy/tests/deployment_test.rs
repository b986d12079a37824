//! End-to-end deployment runs against an in-process scripted chain.
//!
//! The chain mines every transaction instantly, enforces nonces like a node
//! does, and can be told to revert the n-th transaction it receives.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U256};
use ocean_deploy::config::{
    FACTORY_DEPLOYER_PRIVATE_KEY, TEST_PRIVATE_KEY1, TEST_PRIVATE_KEY2, WEB3_INFURA_PROJECT_ID,
};
use ocean_deploy::metadata::MAP_FILENAME;
use ocean_deploy::{
    ArgumentError, CallRequest, ConfigResolver, ConfirmationPolicy, ConnectionState, DeployError,
    DeployResult, DeploymentKey, DeploymentRecords, DeploymentReport, FileRecords, MemoryRecords,
    Network, NetworkConnector, Provider, ProviderFactory, SignedTransaction, StaticArtifacts,
    TestDistribution, TokenHandle, TransactionReceipt, TxKind, pipeline, to_base18,
    validate_network_args,
};
use tempdir::TempDir;
use url::Url;

const CHAIN_ID: u64 = 1337;
const DEPLOYER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const TEST_KEY1: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
const TEST_KEY2: &str = "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

const TEMPLATE_CODE: [u8; 3] = [0x60, 0x01, 0x01];
const FACTORY_CODE: [u8; 3] = [0x60, 0x02, 0x02];
const POOL_CODE: [u8; 3] = [0x60, 0x03, 0x03];
const POOL_FACTORY_CODE: [u8; 3] = [0x60, 0x04, 0x04];

/// A transaction as the chain saw it.
#[derive(Debug, Clone)]
struct Mined {
    nonce: u64,
    to: TxKind,
    input: Bytes,
    created: Option<Address>,
    success: bool,
}

#[derive(Debug, Default)]
struct ChainState {
    nonce: u64,
    mined: Vec<Mined>,
    revert_at: Option<usize>,
    opened: usize,
}

#[derive(Clone, Default)]
struct ScriptedChain {
    state: Arc<Mutex<ChainState>>,
}

impl ScriptedChain {
    fn reverting_at(index: usize) -> Self {
        let chain = Self::default();
        chain.state.lock().unwrap().revert_at = Some(index);
        chain
    }

    fn mined(&self) -> Vec<Mined> {
        self.state.lock().unwrap().mined.clone()
    }

    fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    fn created_with(&self, code: &[u8]) -> Vec<Address> {
        self.mined()
            .iter()
            .filter(|tx| tx.to == TxKind::Create && tx.input.starts_with(code))
            .filter_map(|tx| tx.created)
            .collect()
    }
}

impl Provider for ScriptedChain {
    async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(CHAIN_ID)
    }

    async fn transaction_count(&self, _: Address) -> anyhow::Result<u64> {
        Ok(self.state.lock().unwrap().nonce)
    }

    async fn gas_price(&self) -> anyhow::Result<u128> {
        Ok(1_000_000_000)
    }

    async fn estimate_gas(&self, _: &CallRequest) -> anyhow::Result<u64> {
        Ok(6_000_000)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> anyhow::Result<B256> {
        let mut state = self.state.lock().unwrap();
        anyhow::ensure!(tx.request.chain_id == CHAIN_ID, "wrong chain id");
        anyhow::ensure!(
            tx.request.nonce == state.nonce,
            "nonce too low: expected {}, got {}",
            state.nonce,
            tx.request.nonce
        );
        state.nonce += 1;

        let index = state.mined.len();
        let success = state.revert_at != Some(index);
        let created = (success && tx.request.to == TxKind::Create)
            .then(|| Address::with_last_byte(0x10 + index as u8));
        state.mined.push(Mined {
            nonce: tx.request.nonce,
            to: tx.request.to,
            input: tx.request.input.clone(),
            created,
            success,
        });
        Ok(tx.hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> anyhow::Result<Option<TransactionReceipt>> {
        let state = self.state.lock().unwrap();
        let Some(last) = state.mined.last() else {
            return Ok(None);
        };
        Ok(Some(TransactionReceipt {
            transaction_hash: hash,
            success: last.success,
            contract_address: last.created,
            block_number: Some(state.mined.len() as u64),
        }))
    }
}

impl ProviderFactory for ScriptedChain {
    type Provider = ScriptedChain;

    fn open(&self, _: &Url) -> anyhow::Result<ScriptedChain> {
        self.state.lock().unwrap().opened += 1;
        Ok(self.clone())
    }
}

fn artifacts() -> StaticArtifacts {
    StaticArtifacts::new()
        .with("DataTokenTemplate", TEMPLATE_CODE.to_vec())
        .with("DTFactory", FACTORY_CODE.to_vec())
        .with("BPool", POOL_CODE.to_vec())
        .with("BFactory", POOL_FACTORY_CODE.to_vec())
}

fn ganache_config() -> ConfigResolver {
    ConfigResolver::from_sections([(
        "ganache",
        vec![
            (FACTORY_DEPLOYER_PRIVATE_KEY, DEPLOYER_KEY),
            (TEST_PRIVATE_KEY1, TEST_KEY1),
            (TEST_PRIVATE_KEY2, TEST_KEY2),
        ],
    )])
}

fn connector(chain: &ScriptedChain) -> NetworkConnector<ScriptedChain> {
    NetworkConnector::new(chain.clone()).confirmation(ConfirmationPolicy {
        receipt_timeout: Duration::from_secs(1),
        poll_interval: Duration::from_millis(10),
    })
}

fn address_of(key: &str) -> Address {
    DeploymentKey::parse("key", key).unwrap().address()
}

fn selector(input: &Bytes) -> &[u8] {
    &input[..4]
}

/// `(to, amount)` arguments of a `mint`/`transfer` call.
fn call_args(input: &Bytes) -> (Address, U256) {
    (
        Address::from_slice(&input[16..36]),
        U256::from_be_slice(&input[36..68]),
    )
}

async fn deploy_ganache(
    chain: &ScriptedChain,
    records: &impl DeploymentRecords,
) -> DeployResult<DeploymentReport> {
    pipeline::run(
        &Network::Ganache.profile(),
        &ganache_config(),
        &mut connector(chain),
        &artifacts(),
        records,
    )
    .await
}

#[test]
fn test_zero_arguments_is_a_help_request() {
    let err = validate_network_args::<&str>(&[]).unwrap_err();
    assert_eq!(err, ArgumentError::MissingNetwork);
    assert!(err.is_help_request());
}

#[test]
fn test_unsupported_network_is_rejected() {
    let err = validate_network_args(&["unsupported"]).unwrap_err();
    assert!(!err.is_help_request());
    assert_eq!(
        err.to_string(),
        "Invalid network. Supported networks: 'ganache', 'rinkeby', 'main'"
    );
}

#[tokio::test]
async fn test_ganache_full_run() {
    let chain = ScriptedChain::default();
    let records = MemoryRecords::new();

    let report = deploy_ganache(&chain, &records).await.unwrap();

    let factory = chain.created_with(&FACTORY_CODE);
    let pool_factory = chain.created_with(&POOL_FACTORY_CODE);
    // The template artifact backs both the Template and the stand-in token.
    let templates = chain.created_with(&TEMPLATE_CODE);
    assert_eq!(factory.len(), 1);
    assert_eq!(pool_factory.len(), 1);
    assert_eq!(templates.len(), 2);

    assert_eq!(report.factory, factory[0]);
    assert_eq!(report.pool_factory, pool_factory[0]);
    assert_eq!(report.token, Some(templates[1]));

    let printed = report.to_string();
    let lines: Vec<_> = printed.lines().filter(|l| l.contains(" = ")).collect();
    assert_eq!(
        lines,
        vec![
            format!("DTFACTORY_ADDRESS = {}", factory[0]),
            format!("BFACTORY_ADDRESS = {}", pool_factory[0]),
            format!("OCEAN_ADDRESS = {}", templates[1]),
        ]
    );

    // 4 contracts, the token, one mint and two transfers.
    assert_eq!(chain.mined().len(), 8);
    assert_eq!(
        records.addresses(CHAIN_ID, "DTFactory").unwrap(),
        vec![factory[0]]
    );
}

#[tokio::test]
async fn test_dependents_see_confirmed_addresses() {
    let chain = ScriptedChain::default();
    deploy_ganache(&chain, &MemoryRecords::new()).await.unwrap();

    let mined = chain.mined();
    let position = |code: &[u8]| {
        mined
            .iter()
            .position(|tx| tx.to == TxKind::Create && tx.input.starts_with(code))
            .unwrap()
    };

    let template = chain.created_with(&TEMPLATE_CODE)[0];
    let pool = chain.created_with(&POOL_CODE)[0];
    assert!(position(&TEMPLATE_CODE) < position(&FACTORY_CODE));
    assert!(position(&POOL_CODE) < position(&POOL_FACTORY_CODE));

    // Constructor arguments follow the bytecode; the first word is the dependency.
    let factory_args = &mined[position(&FACTORY_CODE)].input[FACTORY_CODE.len()..];
    assert_eq!(&factory_args[12..32], template.as_slice());
    let pool_factory_args = &mined[position(&POOL_FACTORY_CODE)].input[POOL_FACTORY_CODE.len()..];
    assert_eq!(&pool_factory_args[12..32], pool.as_slice());
}

#[tokio::test]
async fn test_token_minted_once_and_distribution_fits_supply() {
    let chain = ScriptedChain::default();
    let report = deploy_ganache(&chain, &MemoryRecords::new()).await.unwrap();
    let token = report.token.unwrap();

    let mint = TokenHandle::mint_input(Address::ZERO, U256::ZERO);
    let transfer = TokenHandle::transfer_input(Address::ZERO, U256::ZERO);
    let calls: Vec<_> = chain
        .mined()
        .into_iter()
        .filter(|tx| tx.to == TxKind::Call(token))
        .collect();

    let mints: Vec<_> = calls
        .iter()
        .filter(|tx| selector(&tx.input) == selector(&mint))
        .collect();
    assert_eq!(mints.len(), 1);
    let distribution = TestDistribution::default();
    assert_eq!(
        call_args(&mints[0].input),
        (address_of(DEPLOYER_KEY), distribution.cap)
    );

    let transfers: Vec<_> = calls
        .iter()
        .filter(|tx| selector(&tx.input) == selector(&transfer))
        .map(|tx| call_args(&tx.input))
        .collect();
    assert_eq!(
        transfers,
        vec![
            (address_of(TEST_KEY1), distribution.amount),
            (address_of(TEST_KEY2), distribution.amount),
        ]
    );
    let distributed = transfers
        .iter()
        .fold(U256::ZERO, |total, (_, amount)| total + amount);
    assert!(distributed <= distribution.cap);

    // The mint precedes every transfer.
    let first_transfer = calls
        .iter()
        .position(|tx| selector(&tx.input) == selector(&transfer))
        .unwrap();
    let mint_at = calls
        .iter()
        .position(|tx| selector(&tx.input) == selector(&mint))
        .unwrap();
    assert!(mint_at < first_transfer);
}

#[tokio::test]
async fn test_nonces_follow_submission_order() {
    let chain = ScriptedChain::default();
    deploy_ganache(&chain, &MemoryRecords::new()).await.unwrap();

    let nonces: Vec<u64> = chain.mined().iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, (0..8).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_second_ganache_run_forgets_first_template() {
    let chain = ScriptedChain::default();
    let records = MemoryRecords::new();

    deploy_ganache(&chain, &records).await.unwrap();
    let first_template = chain.created_with(&TEMPLATE_CODE)[0];
    assert!(
        records
            .addresses(CHAIN_ID, "DataTokenTemplate")
            .unwrap()
            .contains(&first_template)
    );

    deploy_ganache(&chain, &records).await.unwrap();
    let second_template = chain.created_with(&TEMPLATE_CODE)[2];
    assert_ne!(first_template, second_template);

    let cached = records.addresses(CHAIN_ID, "DataTokenTemplate").unwrap();
    assert!(!cached.contains(&first_template));
    assert!(cached.contains(&second_template));
    assert_eq!(records.addresses(CHAIN_ID, "DTFactory").unwrap().len(), 1);

    // The second run continued from the chain's nonce.
    assert_eq!(chain.mined()[8].nonce, 8);
}

#[tokio::test]
async fn test_main_without_credential_fails_before_connecting() {
    let chain = ScriptedChain::default();
    let config = ConfigResolver::from_sections([(
        "main",
        vec![(FACTORY_DEPLOYER_PRIVATE_KEY, DEPLOYER_KEY)],
    )]);
    let mut connector = connector(&chain);

    let err = pipeline::run(
        &Network::Main.profile(),
        &config,
        &mut connector,
        &artifacts(),
        &MemoryRecords::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DeployError::Configuration(ref msg) if msg.contains(WEB3_INFURA_PROJECT_ID)));
    assert_eq!(chain.opened(), 0);
    assert_eq!(connector.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_main_skips_test_token() {
    let chain = ScriptedChain::default();
    let config = ConfigResolver::from_sections([
        ("DEFAULT", vec![(WEB3_INFURA_PROJECT_ID, "project")]),
        ("main", vec![(FACTORY_DEPLOYER_PRIVATE_KEY, DEPLOYER_KEY)]),
    ]);
    let records = MemoryRecords::new();
    records
        .record(CHAIN_ID, "DTFactory", Address::with_last_byte(0xff))
        .unwrap();

    let report = pipeline::run(
        &Network::Main.profile(),
        &config,
        &mut connector(&chain),
        &artifacts(),
        &records,
    )
    .await
    .unwrap();

    assert_eq!(report.token, None);
    assert_eq!(report.to_string().lines().filter(|l| l.contains(" = ")).count(), 2);
    assert_eq!(chain.mined().len(), 4);
    // Non-ephemeral runs neither reset nor add records.
    assert_eq!(
        records.addresses(CHAIN_ID, "DTFactory").unwrap(),
        vec![Address::with_last_byte(0xff)]
    );
}

#[tokio::test]
async fn test_invalid_deployer_key_fails_before_connecting() {
    let chain = ScriptedChain::default();
    let config = ConfigResolver::from_sections([(
        "ganache",
        vec![(FACTORY_DEPLOYER_PRIVATE_KEY, "0x123")],
    )]);

    let err = pipeline::run(
        &Network::Ganache.profile(),
        &config,
        &mut connector(&chain),
        &artifacts(),
        &MemoryRecords::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "need valid FACTORY_DEPLOYER_PRIVATE_KEY");
    assert_eq!(chain.opened(), 0);
}

#[tokio::test]
async fn test_template_revert_aborts_run() {
    let chain = ScriptedChain::reverting_at(0);
    let records = MemoryRecords::new();

    let err = deploy_ganache(&chain, &records).await.unwrap_err();

    assert!(matches!(err, DeployError::DeploymentFailed { .. }));
    assert_eq!(err.failed_step(), Some("Template"));
    assert!(err.to_string().contains("Template"));

    let mined = chain.mined();
    assert_eq!(mined.len(), 1);
    assert!(chain.created_with(&FACTORY_CODE).is_empty());
    assert!(records.addresses(CHAIN_ID, "DTFactory").unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_transfer_stops_distribution() {
    // Four contracts, token, mint, then the first transfer reverts.
    let chain = ScriptedChain::reverting_at(6);

    let err = deploy_ganache(&chain, &MemoryRecords::new()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some("Token.transfer"));
    assert_eq!(chain.mined().len(), 7);
}

#[tokio::test]
async fn test_file_records_are_reset_between_ganache_runs() {
    let dir = TempDir::new("ocean-deployments").unwrap();
    let records = FileRecords::new(dir.path());
    let chain = ScriptedChain::default();

    deploy_ganache(&chain, &records).await.unwrap();
    let map_path = records.chain_dir(CHAIN_ID).join(MAP_FILENAME);
    assert!(map_path.exists());
    let first_factory = chain.created_with(&FACTORY_CODE)[0];

    deploy_ganache(&chain, &records).await.unwrap();
    let factories = records.addresses(CHAIN_ID, "DTFactory").unwrap();
    assert_eq!(factories, vec![chain.created_with(&FACTORY_CODE)[1]]);
    assert!(!factories.contains(&first_factory));
}

#[tokio::test]
async fn test_unwritable_records_do_not_abort_runs() {
    let dir = TempDir::new("ocean-deployments").unwrap();
    let not_a_dir = dir.path().join("records");
    std::fs::write(&not_a_dir, "").unwrap();
    let records = FileRecords::new(&not_a_dir);

    let chain = ScriptedChain::default();
    let report = deploy_ganache(&chain, &records).await.unwrap();
    assert!(report.token.is_some());
    assert_eq!(chain.mined().len(), 8);

    let chain = ScriptedChain::default();
    let config = ConfigResolver::from_sections([
        ("DEFAULT", vec![(WEB3_INFURA_PROJECT_ID, "project")]),
        ("main", vec![(FACTORY_DEPLOYER_PRIVATE_KEY, DEPLOYER_KEY)]),
    ]);
    pipeline::run(
        &Network::Main.profile(),
        &config,
        &mut connector(&chain),
        &artifacts(),
        &records,
    )
    .await
    .unwrap();
    assert_eq!(chain.created_with(&FACTORY_CODE).len(), 1);
    assert_eq!(chain.mined().len(), 4);
}

#[tokio::test]
async fn test_distribution_over_cap_fails_before_connecting() {
    let chain = ScriptedChain::default();
    let distribution = TestDistribution {
        cap: to_base18(1500),
        ..Default::default()
    };

    let err = pipeline::run_with_distribution(
        &Network::Ganache.profile(),
        &ganache_config(),
        &mut connector(&chain),
        &artifacts(),
        &MemoryRecords::new(),
        distribution,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DeployError::Configuration(_)));
    assert_eq!(chain.opened(), 0);
    assert!(chain.mined().is_empty());
}
