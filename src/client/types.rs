use crate::cluster::types::NodeId;
use crate::protocol::transport::TransportError;

use std::fmt;

/// Where a successful read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    CacheHit,
    FromServer,
}

impl ReadSource {
    pub fn tag(&self) -> &'static str {
        match self {
            ReadSource::CacheHit => "CACHE_HIT",
            ReadSource::FromServer => "FROM_SERVER",
        }
    }
}

impl fmt::Display for ReadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tag front ends show for a failed read.
pub const ERROR_TAG: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub content: String,
    pub source: ReadSource,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The file is not in the ownership map; no node was contacted.
    #[error("Unknown file {0} (no primary mapping)")]
    NoPrimary(String),

    /// The node answered with status ERROR.
    #[error("{0}")]
    Server(String),

    #[error("Connection failed to {node}: {source}")]
    Transport {
        node: NodeId,
        #[source]
        source: TransportError,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),
}
