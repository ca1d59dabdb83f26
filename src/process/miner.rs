// Mining Worker Process Management
//
// The worker drives mining cycles against a node (or a merge-mining proxy)
// and exits once the configured number of blocks has been mined, so
// `start_new` waits for completion rather than for a service port.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::HarnessError;

use super::{ManagedProcess, MinerProcess, core::ProcessCore};

pub struct MiningWorkerProcess {
    core: ProcessCore,
    pub node_address: String,
    pub proxy_address: Option<String>,
    pub max_blocks: u64,
    pub peer_seeds: Vec<String>,
}

impl MiningWorkerProcess {
    pub fn new(
        name: &str,
        node_address: &str,
        proxy_address: Option<&str>,
        base_dir: &Path,
        source_dir: PathBuf,
    ) -> Self {
        let data_dir = base_dir.join("miners").join(name);

        Self {
            core: ProcessCore::new(name, data_dir, source_dir, "mining_worker"),
            node_address: node_address.to_string(),
            proxy_address: proxy_address.map(str::to_string),
            max_blocks: 1,
            peer_seeds: Vec::new(),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--node-address".to_string(),
            self.node_address.clone(),
            "--max-blocks".to_string(),
            self.max_blocks.to_string(),
        ];
        if let Some(proxy) = &self.proxy_address {
            args.push("--proxy-address".to_string());
            args.push(proxy.clone());
        }
        args
    }
}

#[async_trait]
impl ManagedProcess for MiningWorkerProcess {
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
        self.core.spawn(self.args(), None).await?;
        self.core.wait().await
    }

    async fn start(&mut self) -> Result<(), HarnessError> {
        std::fs::create_dir_all(&self.core.data_dir)?;
        self.core.spawn(self.args(), None).await?;
        self.core.wait().await
    }

    async fn stop(&mut self) -> Result<(), HarnessError> {
        self.core.stop(&[]).await
    }
}

impl MinerProcess for MiningWorkerProcess {
    fn set_max_blocks(&mut self, max_blocks: u64) {
        self.max_blocks = max_blocks;
    }
}
