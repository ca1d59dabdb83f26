// Mock Process Implementations
//
// Every collaborator trait implemented in-process: nodes are backed by a
// `MockNodeServer`, the proxy and miner drive a node over its real HTTP
// client, wallets just track lifecycle state. No binaries are compiled or
// spawned.

use std::{
    path::Path,
    sync::Arc,
};

use async_trait::async_trait;

use crate::{
    client::{BaseNodeClient, HttpBaseNodeClient, ProxyClient, noop_block_hook, noop_error_hook},
    error::{ClientError, HarnessError},
    process::{
        BaseNodeOptions, ManagedProcess, MinerProcess, NodeProcess, ProcessFactory, ProxyProcess, WalletProcess,
        get_port,
    },
};

use super::MockNodeServer;

pub struct MockProcessFactory;

impl ProcessFactory for MockProcessFactory {
    fn new_base_node(
        &self,
        name: &str,
        options: BaseNodeOptions,
        _base_dir: &Path,
        _log_config: Option<&Path>,
    ) -> Box<dyn NodeProcess> {
        Box::new(MockNodeProcess::new(name, options.is_seed_node))
    }

    fn new_wallet(&self, name: &str, _base_dir: &Path, _log_config: Option<&Path>) -> Box<dyn WalletProcess> {
        Box::new(MockWalletProcess::new(name))
    }

    fn new_proxy(
        &self,
        name: &str,
        node_address: &str,
        external_chain_address: &str,
        _base_dir: &Path,
        _log_config: Option<&Path>,
    ) -> Box<dyn ProxyProcess> {
        Box::new(MockProxyProcess::new(name, node_address, external_chain_address))
    }

    fn new_miner(
        &self,
        name: &str,
        node_address: &str,
        proxy_address: Option<&str>,
        _base_dir: &Path,
    ) -> Box<dyn MinerProcess> {
        Box::new(MockMinerProcess::new(name, node_address, proxy_address))
    }
}

/// A node whose RPC surface is served by an in-process mock server.
pub struct MockNodeProcess {
    name: String,
    server: MockNodeServer,
    pub is_seed_node: bool,
    pub peer_seeds: Vec<String>,
    public_key: String,
}

impl MockNodeProcess {
    pub fn new(name: &str, is_seed_node: bool) -> Self {
        Self {
            name: name.to_string(),
            server: MockNodeServer::new(get_port(20000..20999)),
            is_seed_node,
            peer_seeds: Vec::new(),
            public_key: crate::process::random_public_key(),
        }
    }
}

#[async_trait]
impl ManagedProcess for MockNodeProcess {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    async fn compile(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    fn set_peer_seeds(&mut self, addresses: Vec<String>) {
        self.peer_seeds = addresses;
    }

    async fn start_new(&mut self) -> Result<(), HarnessError> {
        self.server.reset();
        self.server.start().await
    }

    async fn start(&mut self) -> Result<(), HarnessError> {
        self.server.start().await
    }

    async fn stop(&mut self) -> Result<(), HarnessError> {
        self.server.stop().await;
        Ok(())
    }
}

impl NodeProcess for MockNodeProcess {
    fn peer_address(&self) -> String {
        format!("{}::/ip4/127.0.0.1/tcp/{}", self.public_key, self.server.port())
    }

    fn rpc_address(&self) -> String {
        format!("http://127.0.0.1:{}", self.server.port())
    }

    fn create_client(&self) -> Arc<dyn BaseNodeClient> {
        Arc::new(HttpBaseNodeClient::new(self.rpc_address()))
    }
}

pub struct MockWalletProcess {
    name: String,
    pub peer_seeds: Vec<String>,
    pub running: bool,
}

impl MockWalletProcess {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            peer_seeds: Vec::new(),
            running: false,
        }
    }
}

#[async_trait]
impl ManagedProcess for MockWalletProcess {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    async fn compile(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    fn set_peer_seeds(&mut self, addresses: Vec<String>) {
        self.peer_seeds = addresses;
    }

    async fn start_new(&mut self) -> Result<(), HarnessError> {
        self.running = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), HarnessError> {
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HarnessError> {
        self.running = false;
        Ok(())
    }
}

impl WalletProcess for MockWalletProcess {}

/// Proxy stand-in: its client merge-mines by driving the backing node's
/// template/submit flow directly.
pub struct MockProxyProcess {
    name: String,
    node_address: String,
    pub external_chain_address: String,
    pub running: bool,
}

impl MockProxyProcess {
    pub fn new(name: &str, node_address: &str, external_chain_address: &str) -> Self {
        Self {
            name: name.to_string(),
            node_address: node_address.to_string(),
            external_chain_address: external_chain_address.to_string(),
            running: false,
        }
    }
}

#[async_trait]
impl ManagedProcess for MockProxyProcess {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    async fn compile(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    fn set_peer_seeds(&mut self, _addresses: Vec<String>) {}

    async fn start_new(&mut self) -> Result<(), HarnessError> {
        self.running = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), HarnessError> {
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HarnessError> {
        self.running = false;
        Ok(())
    }
}

impl ProxyProcess for MockProxyProcess {
    // The mock proxy fronts the backing node directly.
    fn address(&self) -> String {
        self.node_address.clone()
    }

    fn create_client(&self) -> Arc<dyn ProxyClient> {
        Arc::new(MockProxyClient {
            node: HttpBaseNodeClient::new(self.node_address.clone()),
        })
    }
}

struct MockProxyClient {
    node: HttpBaseNodeClient,
}

#[async_trait]
impl ProxyClient for MockProxyClient {
    async fn mine_block(&self, weight: u64) -> Result<crate::block::Block, ClientError> {
        self.node
            .mine_block_without_wallet(noop_block_hook(), weight, noop_error_hook())
            .await
    }
}

/// Miner stand-in: `start_new` mines the configured number of blocks against
/// the node and returns.
pub struct MockMinerProcess {
    name: String,
    node: HttpBaseNodeClient,
    pub proxy_address: Option<String>,
    max_blocks: u64,
}

impl MockMinerProcess {
    pub fn new(name: &str, node_address: &str, proxy_address: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            node: HttpBaseNodeClient::new(node_address),
            proxy_address: proxy_address.map(str::to_string),
            max_blocks: 1,
        }
    }
}

#[async_trait]
impl ManagedProcess for MockMinerProcess {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    async fn compile(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }

    fn set_peer_seeds(&mut self, _addresses: Vec<String>) {}

    async fn start_new(&mut self) -> Result<(), HarnessError> {
        for _ in 0..self.max_blocks {
            self.node
                .mine_block_without_wallet(noop_block_hook(), 1, noop_error_hook())
                .await?;
        }
        Ok(())
    }

    async fn start(&mut self) -> Result<(), HarnessError> {
        self.start_new().await
    }

    async fn stop(&mut self) -> Result<(), HarnessError> {
        Ok(())
    }
}

impl MinerProcess for MockMinerProcess {
    fn set_max_blocks(&mut self, max_blocks: u64) {
        self.max_blocks = max_blocks;
    }
}
