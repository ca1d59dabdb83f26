// Mock Base Node HTTP Server
//
// Simulates the base node's query/submission surface: template construction,
// block submission and tip queries. Chain state survives a stop/start pair;
// `reset` gives a fresh chain for `start_new` semantics.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::{
    block::{Block, BlockHeader, placeholder_hash},
    error::HarnessError,
};

#[derive(Debug, Default)]
struct ChainState {
    tip_height: u64,
    blocks: HashMap<u64, Block>,
}

impl ChainState {
    fn tip_hash(&self) -> String {
        self.blocks
            .get(&self.tip_height)
            .map(|b| b.header.hash.clone())
            .unwrap_or_else(|| placeholder_hash(0))
    }
}

/// Mock base node server state.
#[derive(Clone)]
pub struct MockNodeServer {
    chain: Arc<Mutex<ChainState>>,
    server_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    port: u16,
}

impl MockNodeServer {
    pub fn new(port: u16) -> Self {
        Self {
            chain: Arc::new(Mutex::new(ChainState::default())),
            server_handle: Arc::new(Mutex::new(None)),
            port,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tip_height(&self) -> u64 {
        self.chain.lock().unwrap().tip_height
    }

    /// Drop all chain state, as if the node started from a fresh data dir.
    pub fn reset(&self) {
        *self.chain.lock().unwrap() = ChainState::default();
    }

    /// Bind the listener and serve in the background.
    pub async fn start(&self) -> Result<(), HarnessError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = bind_with_retry(addr).await?;

        let app = self.router();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        *self.server_handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.server_handle.lock().unwrap().take() {
            handle.abort();
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/tip_info", get(tip_info_handler))
            .route("/blocks/template", get(block_template_handler))
            .route("/blocks", post(submit_block_handler))
            .route("/headers/{height}", get(get_header_handler))
            .with_state(self.clone())
    }
}

impl Drop for MockNodeServer {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

/// A just-stopped server may not have released the port yet when the same
/// node is started again.
async fn bind_with_retry(addr: SocketAddr) -> Result<tokio::net::TcpListener, HarnessError> {
    let max_tries = 100;
    let mut attempts = 0;

    loop {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(_) if attempts < max_tries => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                attempts += 1;
            },
            Err(e) => return Err(e.into()),
        }
    }
}

async fn tip_info_handler(State(state): State<MockNodeServer>) -> impl IntoResponse {
    let chain = state.chain.lock().unwrap();
    Json(json!({
        "height": chain.tip_height,
        "hash": chain.tip_hash(),
    }))
}

#[derive(Debug, Deserialize)]
struct TemplateQuery {
    #[serde(default)]
    weight: u64,
}

async fn block_template_handler(
    State(state): State<MockNodeServer>,
    Query(query): Query<TemplateQuery>,
) -> impl IntoResponse {
    let chain = state.chain.lock().unwrap();
    let height = chain.tip_height + 1;
    let block = Block {
        header: BlockHeader {
            height,
            prev_hash: chain.tip_hash(),
            hash: placeholder_hash(height),
            timestamp: 1_234_567_890 + height * 120,
        },
        body: json!({ "weight": query.weight }),
    };
    Json(block)
}

async fn submit_block_handler(
    State(state): State<MockNodeServer>,
    Json(block): Json<Block>,
) -> impl IntoResponse {
    let mut chain = state.chain.lock().unwrap();
    let height = block.header.height;
    chain.blocks.insert(height, block);
    if height > chain.tip_height {
        chain.tip_height = height;
    }
    (StatusCode::OK, Json(json!({ "accepted": true, "height": height })))
}

async fn get_header_handler(
    Path(height): Path<u64>,
    State(state): State<MockNodeServer>,
) -> impl IntoResponse {
    let chain = state.chain.lock().unwrap();
    match chain.blocks.get(&height) {
        Some(block) => Json(serde_json::to_value(&block.header).unwrap_or_default()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "no header at height" }))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::get_port;

    #[tokio::test]
    async fn template_chains_onto_the_current_tip() {
        let server = MockNodeServer::new(get_port(24000..24999));
        server.start().await.unwrap();

        let client = reqwest::Client::new();
        let base = format!("http://127.0.0.1:{}", server.port());

        let template: Block = client
            .get(format!("{base}/blocks/template?weight=7"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(template.header.height, 1);
        assert_eq!(template.body["weight"], 7);

        let resp = client.post(format!("{base}/blocks")).json(&template).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(server.tip_height(), 1);

        let next: Block = client
            .get(format!("{base}/blocks/template?weight=1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(next.header.height, 2);
        assert_eq!(next.header.prev_hash, template.header.hash);

        server.stop().await;
    }

    #[tokio::test]
    async fn reset_forgets_the_chain() {
        let server = MockNodeServer::new(get_port(25000..25999));
        server.start().await.unwrap();

        use crate::client::{BaseNodeClient, HttpBaseNodeClient, noop_block_hook, noop_error_hook};
        let client = HttpBaseNodeClient::new(format!("http://127.0.0.1:{}", server.port()));
        client
            .mine_block_without_wallet(noop_block_hook(), 1, noop_error_hook())
            .await
            .unwrap();
        assert_eq!(server.tip_height(), 1);

        server.reset();
        assert_eq!(server.tip_height(), 0);

        server.stop().await;
    }
}
