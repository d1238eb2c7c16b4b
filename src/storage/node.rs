//! Storage Node
//!
//! A node owns a directory-backed shard and is the only writer of it. Writes
//! for files it is primary of are persisted locally, pushed to every peer with
//! REPLICATE and acknowledged to the caller only when enough peers answered.
//!
//! ## Write path
//! 1. Reject the write unless this node is the file's primary.
//! 2. Persist locally. The local copy is never rolled back.
//! 3. Replicate to every peer and count OK replies (no retry).
//! 4. If `1 + acks >= quorum`, push INVALIDATE to every registered client in
//!    the background and report success. Otherwise report a quorum failure
//!    while the local copy stays on disk.

use super::disk::DiskStore;
use super::handlers;
use super::registry::{ClientEndpoint, ClientRegistry};
use crate::cluster::config::ClusterConfig;
use crate::cluster::types::{NodeDescriptor, NodeId, ReplicationMode};
use crate::protocol::transport::{self, TransportOptions};
use crate::protocol::types::Request;

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I am not the primary for {filename}. Primary is {primary}")]
    NotPrimary { filename: String, primary: NodeId },

    #[error("No primary is configured for {filename}")]
    NoPrimary { filename: String },

    #[error("File not found")]
    NotFound,

    #[error("Quorum failed")]
    QuorumFailed { acks: usize, required: usize },

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a write that reached quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Replicas holding the new content, the primary included.
    pub acks: usize,
    pub required: usize,
    pub cluster_size: usize,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Write successful. Quorum met ({}/{})",
            self.acks, self.cluster_size
        )
    }
}

pub struct StorageNode {
    pub local: NodeDescriptor,
    config: Arc<ClusterConfig>,
    shard: DiskStore,
    clients: Arc<ClientRegistry>,
    transport: TransportOptions,
}

impl StorageNode {
    /// Opens the node named `id`, creating its data directory if needed.
    pub async fn open(
        id: &NodeId,
        config: Arc<ClusterConfig>,
        data_dir: impl Into<PathBuf>,
    ) -> Result<Arc<Self>> {
        let local = config
            .nodes
            .get(id)
            .cloned()
            .with_context(|| format!("node {} is not part of the cluster", id))?;
        let data_dir = data_dir.into();
        let shard = DiskStore::open(&data_dir)
            .await
            .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;
        let transport = config.transport_options();

        Ok(Arc::new(Self {
            local,
            config,
            shard,
            clients: Arc::new(ClientRegistry::new()),
            transport,
        }))
    }

    /// Default data directory for a node: `storage_<name>` with spaces replaced.
    pub fn default_data_dir(id: &NodeId) -> PathBuf {
        PathBuf::from(format!("storage_{}", id.as_str().replace(' ', "_")))
    }

    pub fn id(&self) -> &NodeId {
        &self.local.id
    }

    pub fn shard(&self) -> &DiskStore {
        &self.shard
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub(crate) fn transport(&self) -> &TransportOptions {
        &self.transport
    }

    /// Reads this node's own copy. Never asks another node.
    pub async fn read_local(&self, filename: &str) -> Result<String, StorageError> {
        self.shard
            .read(filename)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Accepts a client write for a file this node is primary of.
    ///
    /// The content is persisted locally before any peer is contacted and is
    /// kept even when the quorum is missed.
    ///
    /// # Arguments
    /// * `filename` - Flat key of the file; must be mapped to this node.
    /// * `content` - New content. Replaces any previous copy on every replica reached.
    ///
    /// # Returns
    /// * `Ok(WriteOutcome)` once `1 + acks >= quorum`. Registered clients are
    ///   notified in the background.
    /// * `Err(NotPrimary | NoPrimary)` without touching disk.
    /// * `Err(QuorumFailed)` with the local copy left in place.
    pub async fn write_as_primary(
        &self,
        filename: &str,
        content: &str,
    ) -> Result<WriteOutcome, StorageError> {
        match self.config.ownership.primary_of(filename) {
            Some(primary) if primary == self.id() => {}
            Some(primary) => {
                tracing::warn!(
                    "Rejected write for {}: primary is {}",
                    filename,
                    primary
                );
                return Err(StorageError::NotPrimary {
                    filename: filename.to_string(),
                    primary: primary.clone(),
                });
            }
            None => {
                return Err(StorageError::NoPrimary {
                    filename: filename.to_string(),
                });
            }
        }

        self.shard.write(filename, content).await?;
        tracing::info!("[{}] Wrote {} as primary", self.id(), filename);

        let acks = 1 + self.replicate_to_peers(filename, content).await;
        let required = self.config.quorum;

        if acks < required {
            tracing::warn!(
                "[{}] Quorum failed for {} ({}/{}), local copy kept",
                self.id(),
                filename,
                acks,
                required
            );
            return Err(StorageError::QuorumFailed { acks, required });
        }

        self.spawn_invalidation(filename);

        Ok(WriteOutcome {
            acks,
            required,
            cluster_size: self.config.nodes.len(),
        })
    }

    /// Stores a peer's copy. Any node accepts any file here.
    pub async fn store_replica(&self, filename: &str, content: &str) -> Result<(), StorageError> {
        self.shard.write(filename, content).await?;
        tracing::info!("[{}] Stored replica of {}", self.id(), filename);
        Ok(())
    }

    pub fn register_client(&self, host: &str, port: u16) -> bool {
        self.clients.register(ClientEndpoint::new(host, port))
    }

    /// Pushes the write to every peer and returns how many acknowledged it.
    async fn replicate_to_peers(&self, filename: &str, content: &str) -> usize {
        let request = Request::Replicate {
            filename: filename.to_string(),
            content: content.to_string(),
        };
        let peers: Vec<NodeDescriptor> = self.config.nodes.peers_of(self.id()).cloned().collect();

        match self.config.replication {
            ReplicationMode::Sequential => {
                let mut acks = 0;
                for peer in &peers {
                    if replicate_to_peer(peer, &request, &self.transport).await {
                        acks += 1;
                    }
                }
                acks
            }
            ReplicationMode::Concurrent { peer_timeout_ms } => {
                let options = TransportOptions {
                    io_timeout: Some(Duration::from_millis(peer_timeout_ms)),
                    ..self.transport
                };

                let mut pending = JoinSet::new();
                for peer in peers {
                    let request = request.clone();
                    pending.spawn(async move { replicate_to_peer(&peer, &request, &options).await });
                }

                let mut acks = 0;
                while let Some(joined) = pending.join_next().await {
                    match joined {
                        Ok(true) => acks += 1,
                        Ok(false) => {}
                        Err(e) => tracing::error!("Replication task failed: {}", e),
                    }
                }
                acks
            }
        }
    }

    /// Fire-and-forget INVALIDATE to every client registered so far.
    pub fn spawn_invalidation(&self, filename: &str) -> JoinHandle<()> {
        let clients = self.clients.clone();
        let options = self.transport;
        let request = Request::Invalidate {
            filename: filename.to_string(),
        };

        tokio::spawn(async move {
            for client in clients.snapshot() {
                let addr = client.addr();
                match transport::notify(&addr, &request, &options).await {
                    Ok(()) => tracing::debug!("Sent invalidation to {}", addr),
                    Err(e) => tracing::debug!("Invalidation to {} dropped: {}", addr, e),
                }
            }
        })
    }

    /// Binds the node's configured address and serves until the process exits.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let addr = self.local.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("[{}] Server started on {}", self.id(), addr);

        self.serve(listener).await;
        Ok(())
    }

    /// Accept loop: one task per connection, one exchange per connection.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!("[{}] Connection from {}", self.id(), peer);
                    let node = self.clone();
                    tokio::spawn(async move {
                        handlers::handle_connection(node, stream).await;
                    });
                }
                Err(e) => {
                    tracing::error!("[{}] Failed to accept connection: {}", self.id(), e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn replicate_to_peer(
    peer: &NodeDescriptor,
    request: &Request,
    options: &TransportOptions,
) -> bool {
    match transport::exchange(&peer.addr(), request, options).await {
        Ok(response) if response.is_ok() => {
            tracing::debug!("Replica acknowledged by {}", peer.id);
            true
        }
        Ok(response) => {
            tracing::warn!(
                "Replication refused by {}: {}",
                peer.id,
                response.message_or_default()
            );
            false
        }
        Err(e) => {
            tracing::warn!("Replication failed to {} ({}): {}", peer.id, peer.addr(), e);
            false
        }
    }
}
