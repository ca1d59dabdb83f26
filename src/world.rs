// Shared World for the Feature Suite
//
// One `NetworkWorld` is constructed per scenario and handed by reference to
// every step. It owns the named registries for all process categories, the
// block/transaction bookkeeping the assertion steps read, and the teardown
// that stops everything the scenario started. Registries are insertion
// ordered; re-registering a name overwrites silently.

use std::{
    fmt::{Debug, Formatter},
    future::Future,
    path::PathBuf,
    sync::Arc,
};

use cucumber::World;
use indexmap::IndexMap;
use log::{error, warn};

use crate::{
    block::{Block, BlockHeader},
    client::{BaseNodeClient, BlockHook, ErrorHook},
    error::HarnessError,
    process::{
        self, BaseNodeOptions, MinerProcess, NodeProcess, ProcessFactory, ProxyProcess, WalletProcess,
    },
};

/// Log configuration file paths handed to spawned processes, one per kind.
#[derive(Debug, Clone)]
pub struct LogConfigPaths {
    pub base_node: PathBuf,
    pub proxy: PathBuf,
    pub wallet: PathBuf,
}

impl LogConfigPaths {
    fn from_env() -> Self {
        let path = |var: &str, default: &str| {
            std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
        };
        Self {
            base_node: path("LOG_CONFIG_BASE_NODE", "./log4rs/base_node.yml"),
            proxy: path("LOG_CONFIG_PROXY", "./log4rs/proxy.yml"),
            wallet: path("LOG_CONFIG_WALLET", "./log4rs/wallet.yml"),
        }
    }
}

#[derive(World)]
#[world(init = Self::new)]
pub struct NetworkWorld {
    pub seeds: IndexMap<String, Box<dyn NodeProcess>>,
    pub nodes: IndexMap<String, Box<dyn NodeProcess>>,
    pub proxies: IndexMap<String, Box<dyn ProxyProcess>>,
    pub wallets: IndexMap<String, Box<dyn WalletProcess>>,
    pub miners: IndexMap<String, Box<dyn MinerProcess>>,
    pub clients: IndexMap<String, Arc<dyn BaseNodeClient>>,
    pub blocks: IndexMap<String, Block>,
    pub headers: IndexMap<String, BlockHeader>,
    pub outputs: IndexMap<String, serde_json::Value>,
    pub peers: IndexMap<String, Vec<String>>,
    /// Public-key identifier to the ordered transaction ids recorded for it.
    pub transactions: IndexMap<String, Vec<String>>,
    pub last_result: Option<String>,
    pub result_stack: Vec<serde_json::Value>,
    pub tip_height: u64,
    /// Per-run identifier used to namespace on-disk artifacts.
    pub test_run: String,
    pub base_dir: PathBuf,
    pub log_config: LogConfigPaths,
    factory: Arc<dyn ProcessFactory>,
}

impl NetworkWorld {
    pub fn new() -> Self {
        Self::with_factory(process::factory_from_env())
    }

    pub fn with_factory(factory: Arc<dyn ProcessFactory>) -> Self {
        let test_run = format!("run{}", chrono::Utc::now().timestamp_millis());
        let base_dir = std::env::temp_dir()
            .join(format!("network_tests_{}", std::process::id()))
            .join(&test_run);
        std::fs::create_dir_all(&base_dir).ok();

        Self {
            seeds: IndexMap::new(),
            nodes: IndexMap::new(),
            proxies: IndexMap::new(),
            wallets: IndexMap::new(),
            miners: IndexMap::new(),
            clients: IndexMap::new(),
            blocks: IndexMap::new(),
            headers: IndexMap::new(),
            outputs: IndexMap::new(),
            peers: IndexMap::new(),
            transactions: IndexMap::new(),
            last_result: None,
            result_stack: Vec::new(),
            tip_height: 0,
            test_run,
            base_dir,
            log_config: LogConfigPaths::from_env(),
            factory,
        }
    }

    // =============================
    // Registration
    // =============================

    /// Register a seed node and, atomically, the client bound to it.
    pub fn add_seed_node(&mut self, name: &str, node: Box<dyn NodeProcess>) {
        self.clients.insert(name.to_string(), node.create_client());
        self.seeds.insert(name.to_string(), node);
    }

    /// Register a base node and, atomically, the client bound to it.
    pub fn add_node(&mut self, name: &str, node: Box<dyn NodeProcess>) {
        self.clients.insert(name.to_string(), node.create_client());
        self.nodes.insert(name.to_string(), node);
    }

    pub fn add_wallet(&mut self, name: &str, wallet: Box<dyn WalletProcess>) {
        self.wallets.insert(name.to_string(), wallet);
    }

    pub fn add_mining_node(&mut self, name: &str, miner: Box<dyn MinerProcess>) {
        self.miners.insert(name.to_string(), miner);
    }

    pub fn add_proxy(&mut self, name: &str, proxy: Box<dyn ProxyProcess>) {
        self.proxies.insert(name.to_string(), proxy);
    }

    pub fn add_output(&mut self, name: &str, output: serde_json::Value) {
        self.outputs.insert(name.to_string(), output);
    }

    pub fn add_header(&mut self, name: &str, header: BlockHeader) {
        self.headers.insert(name.to_string(), header);
    }

    pub fn add_peer(&mut self, name: &str, addresses: Vec<String>) {
        self.peers.insert(name.to_string(), addresses);
    }

    /// Append a transaction id to the ordered list recorded for `pub_key`.
    /// Lists are append-only; call order is preserved.
    pub fn add_transaction(&mut self, pub_key: &str, tx_id: &str) {
        self.transactions
            .entry(pub_key.to_string())
            .or_default()
            .push(tx_id.to_string());
    }

    /// Store a block artifact for later submission.
    pub fn save_block(&mut self, name: &str, block: Block) {
        self.blocks.insert(name.to_string(), block);
    }

    // =============================
    // Creation
    // =============================

    /// Construct a base node without registering or starting it, so a caller
    /// can customize it first.
    pub fn create_node(&self, name: &str, options: BaseNodeOptions) -> Box<dyn NodeProcess> {
        self.factory
            .new_base_node(name, options, &self.base_dir, Some(&self.log_config.base_node))
    }

    /// Construct, start and register a seed node, pairing its client under
    /// the same name.
    pub async fn create_seed_node(&mut self, name: &str) -> Result<(), HarnessError> {
        let mut node = self.factory.new_base_node(
            &format!("seed-{name}"),
            BaseNodeOptions {
                is_seed_node: true,
                ..Default::default()
            },
            &self.base_dir,
            Some(&self.log_config.base_node),
        );
        node.start_new().await?;
        self.add_seed_node(name, node);
        Ok(())
    }

    /// Construct a node peered to `addresses`, start it fresh and register it.
    pub async fn create_and_add_node(&mut self, name: &str, addresses: Vec<String>) -> Result<(), HarnessError> {
        let mut node = self.create_node(name, BaseNodeOptions::default());
        node.set_peer_seeds(addresses);
        node.start_new().await?;
        self.add_node(name, node);
        Ok(())
    }

    /// Construct a wallet peered to `node_addresses`, start it fresh and
    /// register it.
    pub async fn create_and_add_wallet(
        &mut self,
        name: &str,
        node_addresses: Vec<String>,
    ) -> Result<(), HarnessError> {
        let mut wallet = self
            .factory
            .new_wallet(name, &self.base_dir, Some(&self.log_config.wallet));
        wallet.set_peer_seeds(node_addresses);
        wallet.start_new().await?;
        self.add_wallet(name, wallet);
        Ok(())
    }

    /// Construct, start and register a merge-mining proxy bridging the named
    /// node and an external chain client.
    pub async fn create_and_add_proxy(
        &mut self,
        name: &str,
        node_name: &str,
        external_chain_address: &str,
    ) -> Result<(), HarnessError> {
        let node_address = self
            .get_node(node_name)
            .ok_or_else(|| HarnessError::unknown("node", node_name))?
            .rpc_address();
        let mut proxy = self.factory.new_proxy(
            name,
            &node_address,
            external_chain_address,
            &self.base_dir,
            Some(&self.log_config.proxy),
        );
        proxy.start_new().await?;
        self.add_proxy(name, proxy);
        Ok(())
    }

    /// Construct and register a mining worker pointed at the named node and,
    /// optionally, the named proxy. The worker is started by `run_miner`.
    pub fn create_and_add_miner(
        &mut self,
        name: &str,
        node_name: &str,
        proxy_name: Option<&str>,
    ) -> Result<(), HarnessError> {
        let node_address = self
            .get_node(node_name)
            .ok_or_else(|| HarnessError::unknown("node", node_name))?
            .rpc_address();
        let proxy_address = match proxy_name {
            Some(proxy_name) => Some(
                self.get_proxy(proxy_name)
                    .ok_or_else(|| HarnessError::unknown("proxy", proxy_name))?
                    .address(),
            ),
            None => None,
        };
        let miner = self
            .factory
            .new_miner(name, &node_address, proxy_address.as_deref(), &self.base_dir);
        self.add_mining_node(name, miner);
        Ok(())
    }

    // =============================
    // Lookups
    // =============================

    pub fn get_client(&self, name: &str) -> Option<Arc<dyn BaseNodeClient>> {
        self.clients.get(name).cloned()
    }

    /// Base node first, then seed nodes, matching the lookup most steps want.
    pub fn get_node(&self, name: &str) -> Option<&dyn NodeProcess> {
        self.nodes
            .get(name)
            .or_else(|| self.seeds.get(name))
            .map(|node| node.as_ref())
    }

    pub fn get_mining_node(&self, name: &str) -> Option<&dyn MinerProcess> {
        self.miners.get(name).map(|miner| miner.as_ref())
    }

    pub fn get_wallet(&self, name: &str) -> Option<&dyn WalletProcess> {
        self.wallets.get(name).map(|wallet| wallet.as_ref())
    }

    pub fn get_proxy(&self, name: &str) -> Option<&dyn ProxyProcess> {
        self.proxies.get(name).map(|proxy| proxy.as_ref())
    }

    pub fn get_block(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    /// Total wallet lookup: if no wallet is registered under `name`, one is
    /// created and started with the current seed address set.
    pub async fn get_or_create_wallet(&mut self, name: &str) -> Result<&dyn WalletProcess, HarnessError> {
        if !self.wallets.contains_key(name) {
            let addresses = self.seed_addresses();
            self.create_and_add_wallet(name, addresses).await?;
        }
        self.wallets
            .get(name)
            .map(|wallet| wallet.as_ref())
            .ok_or_else(|| HarnessError::unknown("wallet", name))
    }

    /// Advertisable addresses of every registered seed node, in registration
    /// order.
    pub fn seed_addresses(&self) -> Vec<String> {
        self.seeds.values().map(|seed| seed.peer_address()).collect()
    }

    // =============================
    // Node lifecycle
    // =============================

    pub async fn stop_node(&mut self, name: &str) -> Result<(), HarnessError> {
        match self.node_mut(name) {
            Some(node) => node.stop().await,
            None => Err(HarnessError::unknown("node", name)),
        }
    }

    pub async fn start_node(&mut self, name: &str) -> Result<(), HarnessError> {
        match self.node_mut(name) {
            Some(node) => node.start().await,
            None => Err(HarnessError::unknown("node", name)),
        }
    }

    fn node_mut(&mut self, name: &str) -> Option<&mut Box<dyn NodeProcess>> {
        if self.seeds.contains_key(name) {
            return self.seeds.get_mut(name);
        }
        self.nodes.get_mut(name)
    }

    // =============================
    // Mining and submission dispatch
    // =============================

    /// Mine one block on the named node, forwarding both hooks to its client.
    pub async fn mine_block(
        &self,
        name: &str,
        weight: u64,
        before_submit: BlockHook,
        on_error: ErrorHook,
    ) -> Result<Block, HarnessError> {
        let client = self
            .get_client(name)
            .ok_or_else(|| HarnessError::unknown("client", name))?;
        Ok(client.mine_block_without_wallet(before_submit, weight, on_error).await?)
    }

    /// Merge mine a block of the given weight through the named proxy.
    pub async fn merge_mine_block(&self, name: &str, weight: u64) -> Result<Block, HarnessError> {
        let proxy = self
            .get_proxy(name)
            .ok_or_else(|| HarnessError::unknown("proxy", name))?;
        let client = proxy.create_client();
        Ok(client.mine_block(weight).await?)
    }

    /// Submit a previously saved block to the named node.
    ///
    /// Submission failure is an observable test outcome, not a harness
    /// error: every failure path is logged and the call resolves `Ok`.
    pub async fn submit_block(&self, block_name: &str, node_name: &str) -> Result<(), HarnessError> {
        let Some(block) = self.blocks.get(block_name) else {
            error!(block = block_name; "no saved block under this name, skipping submission");
            return Ok(());
        };
        let Some(client) = self.get_client(node_name) else {
            error!(node = node_name; "no client registered for this node, skipping submission");
            return Ok(());
        };
        if let Err(e) = client.submit_block(block).await {
            error!(block = block_name, node = node_name, error:% = e; "block submission failed");
        }
        Ok(())
    }

    // =============================
    // Fan-out
    // =============================

    /// Apply `f` to every registered seed and node client concurrently and
    /// wait for all invocations to settle. Fails if any invocation fails,
    /// without reporting which ones succeeded.
    pub async fn for_each_client_async<F, Fut>(&self, f: F) -> Result<(), HarnessError>
    where
        F: Fn(Arc<dyn BaseNodeClient>, String) -> Fut,
        Fut: Future<Output = Result<(), HarnessError>>,
    {
        let mut invocations = Vec::new();
        for name in self.seeds.keys().chain(self.nodes.keys()) {
            match self.clients.get(name) {
                Some(client) => invocations.push(f(Arc::clone(client), name.clone())),
                None => warn!(name = &**name; "registered node has no client"),
            }
        }
        futures::future::try_join_all(invocations).await?;
        Ok(())
    }

    // =============================
    // Teardown
    // =============================

    /// Stop every process the scenario started: seeds, nodes, proxies,
    /// wallets, miners, in that order. Each failing stop is logged and
    /// counted rather than aborting the remaining cleanup; the count is
    /// reported at the end.
    pub async fn stop_all(&mut self) -> Result<(), HarnessError> {
        let mut failures = 0;

        for (name, seed) in &mut self.seeds {
            if let Err(e) = seed.stop().await {
                error!(name = &**name, error:% = e; "failed to stop seed node");
                failures += 1;
            }
        }
        for (name, node) in &mut self.nodes {
            if let Err(e) = node.stop().await {
                error!(name = &**name, error:% = e; "failed to stop node");
                failures += 1;
            }
        }
        for (name, proxy) in &mut self.proxies {
            if let Err(e) = proxy.stop().await {
                error!(name = &**name, error:% = e; "failed to stop proxy");
                failures += 1;
            }
        }
        for (name, wallet) in &mut self.wallets {
            if let Err(e) = wallet.stop().await {
                error!(name = &**name, error:% = e; "failed to stop wallet");
                failures += 1;
            }
        }
        for (name, miner) in &mut self.miners {
            if let Err(e) = miner.stop().await {
                error!(name = &**name, error:% = e; "failed to stop miner");
                failures += 1;
            }
        }

        if failures == 0 {
            Ok(())
        } else {
            Err(HarnessError::Teardown(failures))
        }
    }

    // =============================
    // Miner dispatch
    // =============================

    /// Run the named mining worker until it has mined `blocks` blocks.
    pub async fn run_miner(&mut self, name: &str, blocks: u64) -> Result<(), HarnessError> {
        let miner = self
            .miners
            .get_mut(name)
            .ok_or_else(|| HarnessError::unknown("miner", name))?;
        miner.set_max_blocks(blocks);
        miner.start_new().await
    }
}

impl Debug for NetworkWorld {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkWorld")
            .field("test_run", &self.test_run)
            .field("seeds", &self.seeds.keys().collect::<Vec<_>>())
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("proxies", &self.proxies.keys().collect::<Vec<_>>())
            .field("wallets", &self.wallets.keys().collect::<Vec<_>>())
            .field("miners", &self.miners.keys().collect::<Vec<_>>())
            .field("clients", &self.clients.keys().collect::<Vec<_>>())
            .field("blocks", &self.blocks.keys().collect::<Vec<_>>())
            .field("transactions", &self.transactions)
            .field("tip_height", &self.tip_height)
            .finish_non_exhaustive()
    }
}
