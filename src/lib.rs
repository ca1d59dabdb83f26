// Integration Test Harness for the Localnet Blockchain Topology
//
// This library provides the shared cucumber world and the process/client
// infrastructure used by the feature suite: named registries for seed nodes,
// base nodes, wallets, miners and merge-mining proxies, suite-wide
// compile-once setup, per-scenario teardown and concurrent fan-out over the
// registered RPC clients.

pub mod block;
pub mod client;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod process;
pub mod world;

pub use block::{Block, BlockHeader};
pub use client::{BaseNodeClient, BlockHook, ErrorHook, ProxyClient, noop_block_hook, noop_error_hook};
pub use error::{ClientError, HarnessError};
pub use world::NetworkWorld;
