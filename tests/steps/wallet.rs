// Wallet Step Definitions

use cucumber::{given, then, when};
use integration_tests::NetworkWorld;

#[given(expr = "I have wallet {word} connected to all seed nodes")]
#[when(expr = "I have wallet {word} connected to all seed nodes")]
async fn have_wallet(world: &mut NetworkWorld, name: String) {
    let addresses = world.seed_addresses();
    world
        .create_and_add_wallet(&name, addresses)
        .await
        .unwrap_or_else(|e| panic!("failed to start wallet {name}: {e}"));
}

#[when(expr = "I look up wallet {word}")]
async fn look_up_wallet(world: &mut NetworkWorld, name: String) {
    let wallet = world
        .get_or_create_wallet(&name)
        .await
        .unwrap_or_else(|e| panic!("wallet lookup for {name} failed: {e}"));
    let found = wallet.name().to_string();
    world.last_result = Some(found);
}

#[then(expr = "wallet {word} should exist")]
async fn wallet_exists(world: &mut NetworkWorld, name: String) {
    assert!(world.get_wallet(&name).is_some(), "wallet {name} is not registered");
}

// =============================
// Transaction bookkeeping
// =============================

#[when(expr = "I record transaction {word} for {word}")]
async fn record_transaction(world: &mut NetworkWorld, tx_id: String, pub_key: String) {
    world.add_transaction(&pub_key, &tx_id);
}

#[then(expr = "{word} should have {int} recorded transaction(s)")]
async fn recorded_transaction_count(world: &mut NetworkWorld, pub_key: String, count: usize) {
    let recorded = world.transactions.get(&pub_key).map(Vec::len).unwrap_or_default();
    assert_eq!(recorded, count, "{pub_key} has {recorded} transactions, expected {count}");
}
