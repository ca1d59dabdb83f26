// Process Wrappers
//
// Collaborator contract for every external process kind the world supervises,
// the factory the world constructs processes through, and the spawning
// implementations that drive real binaries. Port probing and readiness
// polling follow the same scheme for every kind: a port counts as up once it
// can no longer be bound locally.

mod core;

pub mod base_node;
pub mod merge_mining_proxy;
pub mod miner;
pub mod wallet;

use std::{
    fmt::Debug,
    net::TcpListener,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use rand::Rng;

pub use base_node::BaseNodeProcess;
pub use merge_mining_proxy::MergeMiningProxyProcess;
pub use miner::MiningWorkerProcess;
pub use wallet::ConsoleWalletProcess;

use crate::{
    client::{BaseNodeClient, ProxyClient},
    error::HarnessError,
};

/// Lifecycle surface shared by every supervised process kind.
///
/// `init` and `compile` are awaited once per suite; `start_new` implies fresh
/// state while `start` resumes an existing instance.
#[async_trait]
pub trait ManagedProcess: Send + Sync {
    fn name(&self) -> &str;

    async fn init(&mut self) -> Result<(), HarnessError>;

    async fn compile(&mut self) -> Result<(), HarnessError>;

    /// Configure the peer bootstrap list; must be called before starting.
    fn set_peer_seeds(&mut self, addresses: Vec<String>);

    async fn start_new(&mut self) -> Result<(), HarnessError>;

    async fn start(&mut self) -> Result<(), HarnessError>;

    async fn stop(&mut self) -> Result<(), HarnessError>;
}

/// A base node or seed node process.
pub trait NodeProcess: ManagedProcess {
    /// Advertisable network address other processes can bootstrap from.
    fn peer_address(&self) -> String;

    /// Address of the node's RPC surface.
    fn rpc_address(&self) -> String;

    /// Client bound to the running process.
    fn create_client(&self) -> Arc<dyn BaseNodeClient>;
}

pub trait WalletProcess: ManagedProcess {}

/// A merge-mining proxy bridging a node and an external chain client.
pub trait ProxyProcess: ManagedProcess {
    /// Address miners point their mining cycles at.
    fn address(&self) -> String;

    fn create_client(&self) -> Arc<dyn ProxyClient>;
}

/// A worker driving mining cycles against a node or proxy. `start_new` runs
/// until the configured number of blocks has been mined.
pub trait MinerProcess: ManagedProcess {
    fn set_max_blocks(&mut self, max_blocks: u64);
}

/// Construction options for a base node, applied before start.
#[derive(Debug, Clone, Default)]
pub struct BaseNodeOptions {
    pub is_seed_node: bool,
    pub extra_args: Vec<String>,
}

/// Strategy the world uses to construct processes, so scenarios can run
/// against spawned binaries or against the in-process mocks.
pub trait ProcessFactory: Send + Sync {
    fn new_base_node(
        &self,
        name: &str,
        options: BaseNodeOptions,
        base_dir: &Path,
        log_config: Option<&Path>,
    ) -> Box<dyn NodeProcess>;

    fn new_wallet(&self, name: &str, base_dir: &Path, log_config: Option<&Path>) -> Box<dyn WalletProcess>;

    fn new_proxy(
        &self,
        name: &str,
        node_address: &str,
        external_chain_address: &str,
        base_dir: &Path,
        log_config: Option<&Path>,
    ) -> Box<dyn ProxyProcess>;

    fn new_miner(
        &self,
        name: &str,
        node_address: &str,
        proxy_address: Option<&str>,
        base_dir: &Path,
    ) -> Box<dyn MinerProcess>;
}

/// Factory producing wrappers that compile and spawn real binaries out of
/// `source_dir`.
pub struct LocalProcessFactory {
    source_dir: PathBuf,
}

impl LocalProcessFactory {
    pub fn new(source_dir: PathBuf) -> Self {
        Self { source_dir }
    }
}

impl ProcessFactory for LocalProcessFactory {
    fn new_base_node(
        &self,
        name: &str,
        options: BaseNodeOptions,
        base_dir: &Path,
        log_config: Option<&Path>,
    ) -> Box<dyn NodeProcess> {
        Box::new(BaseNodeProcess::new(
            name,
            options,
            base_dir,
            log_config,
            self.source_dir.clone(),
        ))
    }

    fn new_wallet(&self, name: &str, base_dir: &Path, log_config: Option<&Path>) -> Box<dyn WalletProcess> {
        Box::new(ConsoleWalletProcess::new(
            name,
            base_dir,
            log_config,
            self.source_dir.clone(),
        ))
    }

    fn new_proxy(
        &self,
        name: &str,
        node_address: &str,
        external_chain_address: &str,
        base_dir: &Path,
        log_config: Option<&Path>,
    ) -> Box<dyn ProxyProcess> {
        Box::new(MergeMiningProxyProcess::new(
            name,
            node_address,
            external_chain_address,
            base_dir,
            log_config,
            self.source_dir.clone(),
        ))
    }

    fn new_miner(
        &self,
        name: &str,
        node_address: &str,
        proxy_address: Option<&str>,
        base_dir: &Path,
    ) -> Box<dyn MinerProcess> {
        Box::new(MiningWorkerProcess::new(
            name,
            node_address,
            proxy_address,
            base_dir,
            self.source_dir.clone(),
        ))
    }
}

/// Selects the factory for this run: spawning wrappers when
/// `INTEGRATION_SRC_DIR` points at a checkout to build, the in-process mocks
/// otherwise.
pub fn factory_from_env() -> Arc<dyn ProcessFactory> {
    match std::env::var("INTEGRATION_SRC_DIR") {
        Ok(dir) => Arc::new(LocalProcessFactory::new(PathBuf::from(dir))),
        Err(_) => Arc::new(crate::mock::MockProcessFactory),
    }
}

/// Probe for a free port in the given range.
pub fn get_port(range: Range<u16>) -> u16 {
    loop {
        let port = rand::thread_rng().gen_range(range.clone());
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return port;
        }
    }
}

/// Wait until a service has come up on `port`.
///
/// If the port can still be bound locally the service is not up yet.
pub(crate) async fn wait_for_service(port: u16) -> Result<(), HarnessError> {
    let max_tries = 4 * 60;
    let mut attempts = 0;

    loop {
        if TcpListener::bind(("127.0.0.1", port)).is_err() {
            return Ok(());
        }

        if attempts >= max_tries {
            return Err(HarnessError::ServiceNotReady(port));
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        attempts += 1;
    }
}

/// Wait until a stopped process has released `port`.
pub(crate) async fn wait_for_release(port: u16) -> Result<(), HarnessError> {
    let max_tries = 4 * 60;
    let mut attempts = 0;

    loop {
        if TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return Ok(());
        }

        if attempts >= max_tries {
            return Err(HarnessError::PortNotReleased(port));
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        attempts += 1;
    }
}

/// Random identity key material, rendered as hex for peer addresses.
pub(crate) fn random_public_key() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}
