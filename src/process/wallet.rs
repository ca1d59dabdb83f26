// Console Wallet Process Management

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::HarnessError;

use super::{ManagedProcess, WalletProcess, core::ProcessCore, get_port};

/// A console wallet process, peered to the given bootstrap addresses.
pub struct ConsoleWalletProcess {
    core: ProcessCore,
    pub port: u16,
    pub rpc_port: u16,
    pub peer_seeds: Vec<String>,
    log_config: Option<PathBuf>,
}

impl ConsoleWalletProcess {
    pub fn new(name: &str, base_dir: &Path, log_config: Option<&Path>, source_dir: PathBuf) -> Self {
        let port = get_port(19000..19499);
        let rpc_port = get_port(19500..19999);
        let data_dir = base_dir.join("wallets").join(format!("{name}_rpc_{rpc_port}"));

        Self {
            core: ProcessCore::new(name, data_dir, source_dir, "console_wallet"),
            port,
            rpc_port,
            peer_seeds: Vec::new(),
            log_config: log_config.map(Path::to_path_buf),
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
            "--password".to_string(),
            "integration".to_string(),
        ];
        if let Some(config) = &self.log_config {
            args.push("--log-config".to_string());
            args.push(config.display().to_string());
        }
        if !self.peer_seeds.is_empty() {
            args.push("--peer-seeds".to_string());
            args.push(self.peer_seeds.join(","));
        }
        args
    }
}

#[async_trait]
impl ManagedProcess for ConsoleWalletProcess {
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

impl WalletProcess for ConsoleWalletProcess {}
