use std::path::PathBuf;

use log::{debug, info};
use tokio::process::{Child, Command};

use crate::error::HarnessError;

use super::{wait_for_release, wait_for_service};

/// Shared plumbing for wrappers that compile and spawn an external binary:
/// binary resolution, child bookkeeping, readiness and shutdown waits.
pub(crate) struct ProcessCore {
    pub name: String,
    pub data_dir: PathBuf,
    pub source_dir: PathBuf,
    pub binary_name: &'static str,
    pub binary: Option<PathBuf>,
    pub child: Option<Child>,
}

impl ProcessCore {
    pub fn new(name: &str, data_dir: PathBuf, source_dir: PathBuf, binary_name: &'static str) -> Self {
        Self {
            name: name.to_string(),
            data_dir,
            source_dir,
            binary_name,
            binary: None,
            child: None,
        }
    }

    /// Prepare the data directory and honour a `<BINARY_NAME>_BINARY`
    /// override, which skips compilation entirely.
    pub async fn init(&mut self) -> Result<(), HarnessError> {
        std::fs::create_dir_all(&self.data_dir)?;
        if let Ok(path) = std::env::var(format!("{}_BINARY", self.binary_name.to_uppercase())) {
            debug!(binary = &*path; "using pre-built binary");
            self.binary = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Build the binary in release mode. Idempotent across scenarios since
    /// cargo rebuilds nothing when the target is current.
    pub async fn compile(&mut self) -> Result<(), HarnessError> {
        if self.binary.is_some() {
            return Ok(());
        }

        info!(binary = self.binary_name; "compiling");
        let status = Command::new("cargo")
            .args(["build", "--release", "--bin", self.binary_name])
            .current_dir(&self.source_dir)
            .status()
            .await?;
        if !status.success() {
            return Err(HarnessError::Compile {
                name: self.name.clone(),
                reason: format!("cargo exited with {status}"),
            });
        }

        self.binary = Some(self.source_dir.join("target/release").join(self.binary_name));
        Ok(())
    }

    fn resolve_binary(&self) -> Result<PathBuf, HarnessError> {
        if let Some(binary) = &self.binary {
            return Ok(binary.clone());
        }
        // Suite setup compiles once up front; pick up the artifact it left.
        let candidate = self.source_dir.join("target/release").join(self.binary_name);
        if candidate.exists() {
            return Ok(candidate);
        }
        Err(HarnessError::Startup {
            name: self.name.clone(),
            reason: format!("binary `{}` has not been compiled", self.binary_name),
        })
    }

    /// Spawn the binary and, when a readiness port is given, wait until the
    /// service is listening on it.
    pub async fn spawn(&mut self, args: Vec<String>, ready_port: Option<u16>) -> Result<(), HarnessError> {
        let binary = self.resolve_binary()?;
        info!(name = &*self.name, binary = &*binary.display().to_string(); "spawning process");

        let child = Command::new(binary)
            .args(&args)
            .current_dir(&self.data_dir)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HarnessError::Startup {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;
        self.child = Some(child);

        if let Some(port) = ready_port {
            wait_for_service(port).await?;
        }
        Ok(())
    }

    /// Block until the child exits on its own, failing on non-zero status.
    pub async fn wait(&mut self) -> Result<(), HarnessError> {
        if let Some(mut child) = self.child.take() {
            let status = child.wait().await?;
            if !status.success() {
                return Err(HarnessError::Startup {
                    name: self.name.clone(),
                    reason: format!("process exited with {status}"),
                });
            }
        }
        Ok(())
    }

    /// Kill the child and wait for its ports to be released.
    pub async fn stop(&mut self, ports: &[u16]) -> Result<(), HarnessError> {
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
            for port in ports {
                wait_for_release(*port).await?;
            }
        }
        Ok(())
    }
}

impl Drop for ProcessCore {
    fn drop(&mut self) {
        if let Some(child) = &mut self.child {
            let _ = child.start_kill();
        }
    }
}
