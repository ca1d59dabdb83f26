use serde::{Deserialize, Serialize};

/// Header of a block as exchanged with the node HTTP surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    pub prev_hash: String,
    pub hash: String,
    pub timestamp: u64,
}

/// A block artifact captured by a mining call, kept around so a later step
/// can submit it to another node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub body: serde_json::Value,
}

impl Block {
    /// A placeholder block at the given height, chained onto `prev_hash`.
    pub fn at_height(height: u64, prev_hash: String) -> Self {
        Block {
            header: BlockHeader {
                height,
                prev_hash,
                hash: placeholder_hash(height),
                timestamp: 1_234_567_890 + height * 120,
            },
            body: serde_json::Value::Null,
        }
    }
}

/// Deterministic stand-in for a block hash at a given height.
pub fn placeholder_hash(height: u64) -> String {
    format!("{height:064x}")
}
