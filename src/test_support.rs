//! Loopback cluster harness shared by the module tests.

use crate::cluster::config::ClusterConfig;
use crate::cluster::ownership::OwnershipMap;
use crate::cluster::types::{NodeDescriptor, NodeId, NodeSet, ReplicationMode};
use crate::storage::node::StorageNode;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, PartialEq)]
enum PeerState {
    Online,
    /// Port reserved then released: connections are refused.
    Offline,
    /// Accepts connections and never answers.
    Stalled,
}

pub struct ClusterBuilder {
    nodes: Vec<(String, PeerState)>,
    quorum: usize,
    ownership: OwnershipMap,
    replication: ReplicationMode,
    io_timeout_ms: Option<u64>,
}

impl ClusterBuilder {
    pub fn new(names: &[&str]) -> Self {
        Self {
            nodes: names
                .iter()
                .map(|name| (name.to_string(), PeerState::Online))
                .collect(),
            quorum: 2,
            ownership: OwnershipMap::new(),
            replication: ReplicationMode::Sequential,
            io_timeout_ms: None,
        }
    }

    pub fn quorum(mut self, quorum: usize) -> Self {
        self.quorum = quorum;
        self
    }

    pub fn owns(mut self, filename: &str, node: &str) -> Self {
        self.ownership = self.ownership.with(filename, node);
        self
    }

    pub fn offline(self, name: &str) -> Self {
        self.with_state(name, PeerState::Offline)
    }

    pub fn stalled(self, name: &str) -> Self {
        self.with_state(name, PeerState::Stalled)
    }

    pub fn replication(mut self, mode: ReplicationMode) -> Self {
        self.replication = mode;
        self
    }

    pub fn io_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.io_timeout_ms = Some(timeout_ms);
        self
    }

    fn with_state(mut self, name: &str, state: PeerState) -> Self {
        for (node, current) in self.nodes.iter_mut() {
            if node == name {
                *current = state;
            }
        }
        self
    }

    pub async fn start(self) -> TestCluster {
        let mut listeners = Vec::new();
        let mut descriptors = Vec::new();
        for (name, state) in &self.nodes {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            descriptors.push(NodeDescriptor::new(name.as_str(), "127.0.0.1", port));
            listeners.push((name.clone(), *state, listener));
        }

        let config = Arc::new(ClusterConfig {
            nodes: NodeSet::new(descriptors),
            ownership: self.ownership,
            quorum: self.quorum,
            replication: self.replication,
            io_timeout_ms: self.io_timeout_ms,
            ..ClusterConfig::default()
        });

        let mut cluster = TestCluster {
            config: config.clone(),
            nodes: HashMap::new(),
            tasks: Vec::new(),
            _dirs: Vec::new(),
        };

        for (name, state, listener) in listeners {
            match state {
                PeerState::Online => {
                    let dir = TempDir::new().unwrap();
                    let node = StorageNode::open(&NodeId::from(name.as_str()), config.clone(), dir.path())
                        .await
                        .unwrap();
                    let server = node.clone();
                    cluster
                        .tasks
                        .push(tokio::spawn(async move { server.serve(listener).await }));
                    cluster.nodes.insert(name, node);
                    cluster._dirs.push(dir);
                }
                PeerState::Offline => drop(listener),
                PeerState::Stalled => {
                    cluster.tasks.push(tokio::spawn(async move {
                        let mut held = Vec::new();
                        while let Ok((stream, _)) = listener.accept().await {
                            held.push(stream);
                        }
                    }));
                }
            }
        }

        cluster
    }
}

pub struct TestCluster {
    pub config: Arc<ClusterConfig>,
    nodes: HashMap<String, Arc<StorageNode>>,
    tasks: Vec<JoinHandle<()>>,
    _dirs: Vec<TempDir>,
}

impl TestCluster {
    pub fn node(&self, name: &str) -> &Arc<StorageNode> {
        &self.nodes[name]
    }

    pub fn addr_of(&self, name: &str) -> String {
        self.config.nodes.get(&NodeId::from(name)).unwrap().addr()
    }
}

impl Drop for TestCluster {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Polls `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
