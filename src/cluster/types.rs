use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A single storage node as every process sees it.
///
/// `host:port` is the address the node accepts protocol connections on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: NodeId::new(id),
            host: host.into(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The fixed collection of nodes in the cluster, in configuration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct NodeSet(Vec<NodeDescriptor>);

impl NodeSet {
    pub fn new(nodes: Vec<NodeDescriptor>) -> Self {
        Self(nodes)
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeDescriptor> {
        self.0.iter().find(|node| &node.id == id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Every node except `id`, in configuration order.
    pub fn peers_of<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeDescriptor> {
        self.0.iter().filter(move |node| &node.id != id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a primary pushes a write to its peers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ReplicationMode {
    /// One peer at a time, each exchange awaited before the next starts.
    #[default]
    Sequential,
    /// All peers at once. Peers that have not answered within
    /// `peer_timeout_ms` are counted as failed.
    Concurrent { peer_timeout_ms: u64 },
}
