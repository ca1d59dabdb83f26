// Merge Mining Proxy Process Management
//
// The proxy bridges a base node and an external chain client; mining calls
// go through its own HTTP surface.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use crate::{
    client::{HttpProxyClient, ProxyClient},
    error::HarnessError,
};

use super::{ManagedProcess, ProxyProcess, core::ProcessCore, get_port};

pub struct MergeMiningProxyProcess {
    core: ProcessCore,
    pub port: u16,
    pub node_address: String,
    pub external_chain_address: String,
    pub peer_seeds: Vec<String>,
    log_config: Option<PathBuf>,
}

impl MergeMiningProxyProcess {
    pub fn new(
        name: &str,
        node_address: &str,
        external_chain_address: &str,
        base_dir: &Path,
        log_config: Option<&Path>,
        source_dir: PathBuf,
    ) -> Self {
        let port = get_port(19600..19999);
        let data_dir = base_dir.join("proxies").join(format!("{name}_{port}"));

        Self {
            core: ProcessCore::new(name, data_dir, source_dir, "merge_mining_proxy"),
            port,
            node_address: node_address.to_string(),
            external_chain_address: external_chain_address.to_string(),
            peer_seeds: Vec::new(),
            log_config: log_config.map(Path::to_path_buf),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--base-path".to_string(),
            self.core.data_dir.display().to_string(),
            "--listen-port".to_string(),
            self.port.to_string(),
            "--node-address".to_string(),
            self.node_address.clone(),
            "--external-chain-address".to_string(),
            self.external_chain_address.clone(),
        ];
        if let Some(config) = &self.log_config {
            args.push("--log-config".to_string());
            args.push(config.display().to_string());
        }
        args
    }
}

#[async_trait]
impl ManagedProcess for MergeMiningProxyProcess {
    fn name(&self) -> &str {
        &self.core.name
    }

    async fn init(&mut self) -> Result<(), HarnessError> {
        self.core.init().await
    }

    async fn compile(&mut self) -> Result<(), HarnessError> {
        self.core.compile().await
    }

    fn set_peer_seeds(&mut self, addresses: Vec<String>) {
        self.peer_seeds = addresses;
    }

    async fn start_new(&mut self) -> Result<(), HarnessError> {
        let _ = std::fs::remove_dir_all(&self.core.data_dir);
        std::fs::create_dir_all(&self.core.data_dir)?;
        self.core.spawn(self.args(), Some(self.port)).await
    }

    async fn start(&mut self) -> Result<(), HarnessError> {
        std::fs::create_dir_all(&self.core.data_dir)?;
        self.core.spawn(self.args(), Some(self.port)).await
    }

    async fn stop(&mut self) -> Result<(), HarnessError> {
        let ports = [self.port];
        self.core.stop(&ports).await
    }
}

impl ProxyProcess for MergeMiningProxyProcess {
    fn address(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    fn create_client(&self) -> Arc<dyn ProxyClient> {
        Arc::new(HttpProxyClient::new(self.address()))
    }
}
