// Node Step Definitions
//
// Steps for building the network topology and observing chain state.

use cucumber::{given, then, when};
use integration_tests::{NetworkWorld, noop_block_hook, noop_error_hook};

// =============================
// Topology
// =============================

#[given(expr = "I have a seed node {word}")]
#[when(expr = "I have a seed node {word}")]
async fn have_seed_node(world: &mut NetworkWorld, name: String) {
    world
        .create_seed_node(&name)
        .await
        .unwrap_or_else(|e| panic!("failed to start seed node {name}: {e}"));
}

#[given(expr = "I have a base node {word} connected to all seed nodes")]
#[when(expr = "I have a base node {word} connected to all seed nodes")]
async fn have_base_node(world: &mut NetworkWorld, name: String) {
    let addresses = world.seed_addresses();
    world
        .create_and_add_node(&name, addresses)
        .await
        .unwrap_or_else(|e| panic!("failed to start base node {name}: {e}"));
}

#[when(expr = "I stop node {word}")]
async fn stop_node(world: &mut NetworkWorld, name: String) {
    world
        .stop_node(&name)
        .await
        .unwrap_or_else(|e| panic!("failed to stop node {name}: {e}"));
}

#[when(expr = "I start node {word}")]
async fn start_node(world: &mut NetworkWorld, name: String) {
    world
        .start_node(&name)
        .await
        .unwrap_or_else(|e| panic!("failed to start node {name}: {e}"));
}

// =============================
// Mining
// =============================

#[when(expr = "I mine {int} block(s) on {word}")]
async fn mine_blocks(world: &mut NetworkWorld, blocks: u64, name: String) {
    for _ in 0..blocks {
        world
            .mine_block(&name, 1, noop_block_hook(), noop_error_hook())
            .await
            .unwrap_or_else(|e| panic!("mining on {name} failed: {e}"));
    }
}

// =============================
// Assertions
// =============================

#[then(expr = "node {word} should be at height {int}")]
async fn node_at_height(world: &mut NetworkWorld, name: String, height: u64) {
    let client = world
        .get_client(&name)
        .unwrap_or_else(|| panic!("no client registered for {name}"));
    let tip = client
        .tip_height()
        .await
        .unwrap_or_else(|e| panic!("tip query on {name} failed: {e}"));
    assert_eq!(tip, height, "{name} is at height {tip}, expected {height}");
}

#[then("every node should report a chain tip")]
async fn every_node_reports_a_tip(world: &mut NetworkWorld) {
    world
        .for_each_client_async(|client, name| async move {
            let tip = client.tip_height().await?;
            log::info!(name = &*name, tip = tip; "node reported its tip");
            Ok(())
        })
        .await
        .expect("a node failed to report its tip");
}

#[then(expr = "I should have {int} registered clients")]
async fn registered_client_count(world: &mut NetworkWorld, count: usize) {
    assert_eq!(world.clients.len(), count);
}
