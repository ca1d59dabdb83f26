// In-Process Mocks
//
// Lightweight stand-ins for every process kind, backed by a mock HTTP server
// that simulates the minimal base node surface the real clients talk to.
// Used by the feature suite when no source checkout is configured, and by
// unit tests.

mod node_server;
mod processes;

pub use node_server::MockNodeServer;
pub use processes::{MockMinerProcess, MockNodeProcess, MockProcessFactory, MockProxyProcess, MockWalletProcess};
