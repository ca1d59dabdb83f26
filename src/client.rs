// RPC Clients
//
// Client traits the world dispatches through, plus the HTTP implementations
// bound to a running base node or merge-mining proxy. Hooks are explicit
// function-typed parameters; the client decides when they fire.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    block::Block,
    error::ClientError,
};

/// Called with the candidate block after template construction, before it is
/// submitted to the node.
pub type BlockHook = Arc<dyn Fn(&Block) + Send + Sync>;

/// Called with the error when a mining cycle fails at any point.
pub type ErrorHook = Arc<dyn Fn(&ClientError) + Send + Sync>;

pub fn noop_block_hook() -> BlockHook {
    Arc::new(|_| {})
}

pub fn noop_error_hook() -> ErrorHook {
    Arc::new(|_| {})
}

/// Client bound to a running base node or seed node.
#[async_trait]
pub trait BaseNodeClient: Send + Sync {
    /// Mine one block directly against the node, without an attached wallet.
    ///
    /// `before_submit` fires once the candidate block is built, `on_error`
    /// fires if any stage of the cycle fails. The error is still returned.
    async fn mine_block_without_wallet(
        &self,
        before_submit: BlockHook,
        weight: u64,
        on_error: ErrorHook,
    ) -> Result<Block, ClientError>;

    /// Submit an externally produced block to the node.
    async fn submit_block(&self, block: &Block) -> Result<(), ClientError>;

    /// Current chain tip height reported by the node.
    async fn tip_height(&self) -> Result<u64, ClientError>;
}

/// Client bound to a running merge-mining proxy.
#[async_trait]
pub trait ProxyClient: Send + Sync {
    async fn mine_block(&self, weight: u64) -> Result<Block, ClientError>;
}

/// HTTP client for the base node query/submission surface.
pub struct HttpBaseNodeClient {
    base_url: String,
    inner: reqwest::Client,
}

impl HttpBaseNodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            inner: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn block_template(&self, weight: u64) -> Result<Block, ClientError> {
        let endpoint = format!("{}/blocks/template", self.base_url);
        let resp = self
            .inner
            .get(&endpoint)
            .query(&[("weight", weight)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::UnexpectedStatus {
                endpoint,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<Block>().await?)
    }
}

#[async_trait]
impl BaseNodeClient for HttpBaseNodeClient {
    async fn mine_block_without_wallet(
        &self,
        before_submit: BlockHook,
        weight: u64,
        on_error: ErrorHook,
    ) -> Result<Block, ClientError> {
        let result = async {
            let block = self.block_template(weight).await?;
            before_submit(&block);
            self.submit_block(&block).await?;
            Ok(block)
        }
        .await;

        if let Err(e) = &result {
            on_error(e);
        }
        result
    }

    async fn submit_block(&self, block: &Block) -> Result<(), ClientError> {
        let endpoint = format!("{}/blocks", self.base_url);
        let resp = self.inner.post(&endpoint).json(block).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::UnexpectedStatus {
                endpoint,
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn tip_height(&self) -> Result<u64, ClientError> {
        let endpoint = format!("{}/tip_info", self.base_url);
        let resp = self.inner.get(&endpoint).send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::UnexpectedStatus {
                endpoint,
                status: resp.status().as_u16(),
            });
        }
        let info = resp.json::<Value>().await?;
        Ok(info["height"].as_u64().unwrap_or_default())
    }
}

/// HTTP client for the merge-mining proxy.
pub struct HttpProxyClient {
    base_url: String,
    inner: reqwest::Client,
}

impl HttpProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            inner: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ProxyClient for HttpProxyClient {
    async fn mine_block(&self, weight: u64) -> Result<Block, ClientError> {
        let endpoint = format!("{}/mine", self.base_url);
        let resp = self
            .inner
            .post(&endpoint)
            .json(&json!({ "weight": weight }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::UnexpectedStatus {
                endpoint,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<Block>().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::mock::MockNodeServer;
    use crate::process::get_port;

    #[tokio::test]
    async fn mining_advances_the_tip_and_fires_before_submit() {
        let server = MockNodeServer::new(get_port(21000..21999));
        server.start().await.unwrap();

        let client = HttpBaseNodeClient::new(format!("http://127.0.0.1:{}", server.port()));
        assert_eq!(client.tip_height().await.unwrap(), 0);

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_hook = Arc::clone(&fired);
        let block = client
            .mine_block_without_wallet(
                Arc::new(move |_| {
                    fired_in_hook.fetch_add(1, Ordering::SeqCst);
                }),
                1,
                noop_error_hook(),
            )
            .await
            .unwrap();

        assert_eq!(block.header.height, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(client.tip_height().await.unwrap(), 1);

        server.stop().await;
    }

    #[tokio::test]
    async fn submitting_a_saved_block_raises_a_lagging_node() {
        let server = MockNodeServer::new(get_port(22000..22999));
        server.start().await.unwrap();

        let client = HttpBaseNodeClient::new(format!("http://127.0.0.1:{}", server.port()));
        let block = Block::at_height(5, crate::block::placeholder_hash(4));
        client.submit_block(&block).await.unwrap();
        assert_eq!(client.tip_height().await.unwrap(), 5);

        server.stop().await;
    }

    #[tokio::test]
    async fn on_error_fires_when_the_node_is_unreachable() {
        // Nothing is listening here.
        let client = HttpBaseNodeClient::new(format!("http://127.0.0.1:{}", get_port(23000..23999)));

        let errors = Arc::new(AtomicUsize::new(0));
        let errors_in_hook = Arc::clone(&errors);
        let result = client
            .mine_block_without_wallet(
                noop_block_hook(),
                1,
                Arc::new(move |_| {
                    errors_in_hook.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
