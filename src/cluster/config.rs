//! Cluster Configuration
//!
//! Loads and validates the values every node and client must share. The
//! built-in default is a three-node cluster on localhost; a JSON file can
//! replace it wholesale.

use super::ownership::OwnershipMap;
use super::types::{NodeDescriptor, NodeId, NodeSet, ReplicationMode};
use crate::protocol::transport::TransportOptions;
use crate::storage::disk::validate_filename;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_QUORUM: usize = 2;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cluster has no nodes")]
    NoNodes,

    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("quorum {quorum} must be between 1 and the node count {nodes}")]
    InvalidQuorum { quorum: usize, nodes: usize },

    #[error("owned filename {0:?} is not a single path component")]
    InvalidFilename(String),

    #[error("file {filename} is owned by unknown node {node}")]
    UnknownOwner { filename: String, node: NodeId },

    #[error("max_message_size must be greater than zero")]
    ZeroMessageSize,
}

/// Everything a node or client needs to know about the cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    pub nodes: NodeSet,
    pub ownership: OwnershipMap,
    pub quorum: usize,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default)]
    pub replication: ReplicationMode,
    /// Per-exchange socket timeout. `None` means every connect, send and
    /// receive may block indefinitely.
    #[serde(default)]
    pub io_timeout_ms: Option<u64>,
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

impl Default for ClusterConfig {
    fn default() -> Self {
        let nodes = NodeSet::new(vec![
            NodeDescriptor::new("New York", "localhost", 8000),
            NodeDescriptor::new("Toronto", "localhost", 8001),
            NodeDescriptor::new("London", "localhost", 8002),
        ]);
        let ownership = OwnershipMap::new()
            .with("file1.txt", "New York")
            .with("file2.txt", "Toronto")
            .with("file3.txt", "London");

        Self {
            nodes,
            ownership,
            quorum: DEFAULT_QUORUM,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            replication: ReplicationMode::Sequential,
            io_timeout_ms: None,
        }
    }
}

impl ClusterConfig {
    /// Reads a JSON config file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ClusterConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise falls back to the built-in cluster.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }

        let mut seen = HashSet::new();
        for node in self.nodes.iter() {
            if !seen.insert(&node.id) {
                return Err(ConfigError::DuplicateNode(node.id.clone()));
            }
        }

        if self.quorum == 0 || self.quorum > self.nodes.len() {
            return Err(ConfigError::InvalidQuorum {
                quorum: self.quorum,
                nodes: self.nodes.len(),
            });
        }

        for filename in self.ownership.files() {
            if validate_filename(filename).is_err() {
                return Err(ConfigError::InvalidFilename(filename.to_string()));
            }
            if let Some(owner) = self.ownership.primary_of(filename)
                && !self.nodes.contains(owner)
            {
                return Err(ConfigError::UnknownOwner {
                    filename: filename.to_string(),
                    node: owner.clone(),
                });
            }
        }

        if self.max_message_size == 0 {
            return Err(ConfigError::ZeroMessageSize);
        }

        Ok(())
    }

    /// The node that must accept writes for `filename`, if it is mapped.
    pub fn primary_for(&self, filename: &str) -> Option<&NodeDescriptor> {
        self.ownership
            .primary_of(filename)
            .and_then(|id| self.nodes.get(id))
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            max_message_size: self.max_message_size,
            io_timeout: self.io_timeout_ms.map(Duration::from_millis),
        }
    }
}
