// Suite-Wide Setup
//
// Compilation is expensive and idempotent across scenarios, so one throwaway
// instance of each process kind is built before any scenario runs. A failure
// here fails the whole run fast.

use std::{path::Path, time::Duration};

use log::info;

use crate::{
    error::HarnessError,
    process::{BaseNodeOptions, ProcessFactory},
};

/// Generous budget: the first compilation of four binaries from a cold
/// target directory can take a while.
pub const SUITE_SETUP_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Build every process kind once, in a fixed order: base node, wallet,
/// merge-mining proxy, mining worker. Each goes through `init` then
/// `compile`, sequentially.
pub async fn compile_all(factory: &dyn ProcessFactory, base_dir: &Path) -> Result<(), HarnessError> {
    tokio::time::timeout(SUITE_SETUP_TIMEOUT, compile_each(factory, base_dir))
        .await
        .map_err(|_| HarnessError::SuiteSetupTimeout)?
}

async fn compile_each(factory: &dyn ProcessFactory, base_dir: &Path) -> Result<(), HarnessError> {
    info!("compiling base node...");
    let mut base_node = factory.new_base_node("compile", BaseNodeOptions::default(), base_dir, None);
    base_node.init().await?;
    base_node.compile().await?;

    info!("compiling wallet...");
    let mut wallet = factory.new_wallet("compile", base_dir, None);
    wallet.init().await?;
    wallet.compile().await?;

    info!("compiling merge mining proxy...");
    let mut proxy = factory.new_proxy("compile", "127.0.0.1:9999", "127.0.0.1:9998", base_dir, None);
    proxy.init().await?;
    proxy.compile().await?;

    info!("compiling mining worker...");
    let mut miner = factory.new_miner("compile", "127.0.0.1:9999", Some("127.0.0.1:9998"), base_dir);
    miner.init().await?;
    miner.compile().await?;

    info!("finished compilation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProcessFactory;

    #[tokio::test]
    async fn suite_setup_succeeds_against_mocks() {
        let dir = tempfile::tempdir().unwrap();
        compile_all(&MockProcessFactory, dir.path()).await.unwrap();
    }
}
