// Base Node Process Management
//
// Spawns and manages base node / seed node binaries on localnet ports.

use std::{
    fmt::{Debug, Formatter},
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;

use crate::{
    client::{BaseNodeClient, HttpBaseNodeClient},
    error::HarnessError,
};

use super::{BaseNodeOptions, ManagedProcess, NodeProcess, core::ProcessCore, get_port, random_public_key};

/// A base node process. Seed nodes are base nodes whose address is handed to
/// other processes as a bootstrap peer.
pub struct BaseNodeProcess {
    core: ProcessCore,
    pub port: u16,
    pub rpc_port: u16,
    pub is_seed_node: bool,
    pub peer_seeds: Vec<String>,
    public_key: String,
    log_config: Option<PathBuf>,
    extra_args: Vec<String>,
}

impl BaseNodeProcess {
    pub fn new(
        name: &str,
        options: BaseNodeOptions,
        base_dir: &Path,
        log_config: Option<&Path>,
        source_dir: PathBuf,
    ) -> Self {
        // Each spawned base node uses different ports
        let port = get_port(18000..18499);
        let rpc_port = get_port(18500..18999);
        let data_dir = base_dir.join("base_nodes").join(format!("{name}_rpc_{rpc_port}"));

        Self {
            core: ProcessCore::new(name, data_dir, source_dir, "base_node"),
            port,
            rpc_port,
            is_seed_node: options.is_seed_node,
            peer_seeds: Vec::new(),
            public_key: random_public_key(),
            log_config: log_config.map(Path::to_path_buf),
            extra_args: options.extra_args,
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--network".to_string(),
            "localnet".to_string(),
            "--base-path".to_string(),
            self.core.data_dir.display().to_string(),
            "--listen-port".to_string(),
            self.port.to_string(),
            "--rpc-port".to_string(),
            self.rpc_port.to_string(),
        ];
        if let Some(config) = &self.log_config {
            args.push("--log-config".to_string());
            args.push(config.display().to_string());
        }
        if !self.peer_seeds.is_empty() {
            args.push("--peer-seeds".to_string());
            args.push(self.peer_seeds.join(","));
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl ManagedProcess for BaseNodeProcess {
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
        self.core.spawn(self.args(), Some(self.rpc_port)).await
    }

    async fn start(&mut self) -> Result<(), HarnessError> {
        std::fs::create_dir_all(&self.core.data_dir)?;
        self.core.spawn(self.args(), Some(self.rpc_port)).await
    }

    async fn stop(&mut self) -> Result<(), HarnessError> {
        let ports = [self.port, self.rpc_port];
        self.core.stop(&ports).await
    }
}

impl NodeProcess for BaseNodeProcess {
    fn peer_address(&self) -> String {
        format!("{}::/ip4/127.0.0.1/tcp/{}", self.public_key, self.port)
    }

    fn rpc_address(&self) -> String {
        format!("http://127.0.0.1:{}", self.rpc_port)
    }

    fn create_client(&self) -> Arc<dyn BaseNodeClient> {
        Arc::new(HttpBaseNodeClient::new(self.rpc_address()))
    }
}

impl Debug for BaseNodeProcess {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseNodeProcess")
            .field("name", &self.core.name)
            .field("port", &self.port)
            .field("rpc_port", &self.rpc_port)
            .field("is_seed_node", &self.is_seed_node)
            .field("peer_seeds", &self.peer_seeds)
            .finish_non_exhaustive()
    }
}
