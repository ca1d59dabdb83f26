use thiserror::Error;

/// Errors produced by the harness itself: process lifecycle, registry
/// lookups behind dispatch operations, and suite setup/teardown.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("unknown {kind} `{name}`")]
    UnknownEntity { kind: &'static str, name: String },
    #[error("process `{name}` failed to start: {reason}")]
    Startup { name: String, reason: String },
    #[error("compilation of `{name}` failed: {reason}")]
    Compile { name: String, reason: String },
    #[error("service on port {0} did not become reachable in time")]
    ServiceNotReady(u16),
    #[error("port {0} was not released after shutdown")]
    PortNotReleased(u16),
    #[error("suite setup timed out")]
    SuiteSetupTimeout,
    #[error("teardown finished with {0} failed stop(s)")]
    Teardown(usize),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub fn unknown(kind: &'static str, name: &str) -> Self {
        HarnessError::UnknownEntity {
            kind,
            name: name.to_string(),
        }
    }
}

/// Errors produced by the RPC clients bound to running processes.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },
    #[error("block rejected: {0}")]
    Rejected(String),
}
