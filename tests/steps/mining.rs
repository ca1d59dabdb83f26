// Mining Step Definitions
//
// Merge-mining proxies, mining workers, and saved-block submission.

use cucumber::{given, then, when};
use integration_tests::{NetworkWorld, noop_block_hook, noop_error_hook};

// The external chain client the proxy would bridge to; nothing listens
// there in this suite.
const EXTERNAL_CHAIN_ADDRESS: &str = "127.0.0.1:9998";

#[given(expr = "I have a merge mining proxy {word} connected to {word}")]
async fn have_proxy(world: &mut NetworkWorld, name: String, node_name: String) {
    world
        .create_and_add_proxy(&name, &node_name, EXTERNAL_CHAIN_ADDRESS)
        .await
        .unwrap_or_else(|e| panic!("failed to start proxy {name}: {e}"));
}

#[given(expr = "I have a mining worker {word} connected to {word}")]
async fn have_miner(world: &mut NetworkWorld, name: String, node_name: String) {
    world
        .create_and_add_miner(&name, &node_name, None)
        .unwrap_or_else(|e| panic!("failed to register miner {name}: {e}"));
}

#[when(expr = "I merge mine a block with weight {int} via {word}")]
async fn merge_mine(world: &mut NetworkWorld, weight: u64, name: String) {
    world
        .merge_mine_block(&name, weight)
        .await
        .unwrap_or_else(|e| panic!("merge mining via {name} failed: {e}"));
}

#[when(expr = "mining worker {word} mines {int} block(s)")]
async fn run_miner(world: &mut NetworkWorld, name: String, blocks: u64) {
    world
        .run_miner(&name, blocks)
        .await
        .unwrap_or_else(|e| panic!("miner {name} failed: {e}"));
}

#[when(expr = "I mine and save a block named {word} on {word}")]
async fn mine_and_save(world: &mut NetworkWorld, block_name: String, node_name: String) {
    let block = world
        .mine_block(&node_name, 1, noop_block_hook(), noop_error_hook())
        .await
        .unwrap_or_else(|e| panic!("mining on {node_name} failed: {e}"));
    world.save_block(&block_name, block);
}

#[when(expr = "I submit block {word} to {word}")]
async fn submit_block(world: &mut NetworkWorld, block_name: String, node_name: String) {
    // Submission failures are logged, never propagated.
    world
        .submit_block(&block_name, &node_name)
        .await
        .expect("submit_block must not fail the step");
}

#[then(expr = "block {word} should be saved")]
async fn block_is_saved(world: &mut NetworkWorld, block_name: String) {
    assert!(world.get_block(&block_name).is_some(), "block {block_name} was not saved");
}
