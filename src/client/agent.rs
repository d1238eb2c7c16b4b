//! Cache Agent
//!
//! Read-through cache in front of the storage nodes. The agent never updates
//! its cache on write; it relies on the primary's INVALIDATE (or a later read
//! miss) to converge.

use super::types::{AgentError, ReadOutcome, ReadSource};
use crate::cluster::config::ClusterConfig;
use crate::cluster::types::NodeDescriptor;
use crate::protocol::transport::{self, InboundError, TransportOptions};
use crate::protocol::types::{Request, Response};
use crate::storage::disk::DiskStore;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const INVALIDATION_CHANNEL_CAPACITY: usize = 64;

pub struct CacheAgent {
    /// Address advertised to nodes in REGISTER.
    pub host: String,
    pub port: u16,
    config: Arc<ClusterConfig>,
    cache: DiskStore,
    transport: TransportOptions,
    invalidations: broadcast::Sender<String>,
}

impl CacheAgent {
    pub async fn open(
        host: impl Into<String>,
        port: u16,
        config: Arc<ClusterConfig>,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<Arc<Self>> {
        let cache_dir = cache_dir.into();
        let cache = DiskStore::open(&cache_dir)
            .await
            .with_context(|| format!("failed to open cache directory {}", cache_dir.display()))?;
        let transport = config.transport_options();
        let (invalidations, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);

        Ok(Arc::new(Self {
            host: host.into(),
            port,
            config,
            cache,
            transport,
            invalidations,
        }))
    }

    pub fn default_cache_dir(port: u16) -> PathBuf {
        PathBuf::from(format!("client_cache_{}", port))
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn cache(&self) -> &DiskStore {
        &self.cache
    }

    /// Receives the filename of every invalidation this agent handles.
    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<String> {
        self.invalidations.subscribe()
    }

    /// Serves from cache, or fetches from the file's primary and caches the result.
    ///
    /// # Arguments
    /// * `filename` - Must have a primary in the ownership map.
    ///
    /// # Returns
    /// * `Ok(ReadOutcome)` tagged `CacheHit` or `FromServer`.
    /// * `Err(NoPrimary)` for unmapped names, with no network call.
    /// * `Err(Server)` with the node's message. Nothing is cached.
    /// * `Err(Transport)` if the primary could not be reached.
    pub async fn read(&self, filename: &str) -> Result<ReadOutcome, AgentError> {
        // Only mapped names are ever cached, so resolving first costs no hit.
        let primary = self.primary_for(filename)?;

        if let Some(content) = self.cache.read(filename).await? {
            return Ok(ReadOutcome {
                content,
                source: ReadSource::CacheHit,
            });
        }

        tracing::debug!("Cache miss for {}, fetching from primary", filename);
        let response = self
            .send(
                primary,
                &Request::Read {
                    filename: filename.to_string(),
                },
            )
            .await?;

        if !response.is_ok() {
            return Err(AgentError::Server(response.message_or_default().to_string()));
        }

        let content = response.content.unwrap_or_default();
        if let Err(e) = self.cache.write(filename, &content).await {
            tracing::warn!("Failed to cache {}: {}", filename, e);
        }

        Ok(ReadOutcome {
            content,
            source: ReadSource::FromServer,
        })
    }

    /// Sends WRITE to the file's primary and returns its answer unchanged.
    ///
    /// # Arguments
    /// * `filename` - Must have a primary in the ownership map.
    /// * `content` - Sent as is. The local cache is not touched.
    ///
    /// # Returns
    /// * `Ok(Response)` exactly as the node sent it. A quorum failure is an
    ///   `Ok` holding an ERROR response.
    /// * `Err(NoPrimary)` for unmapped names, with no network call.
    /// * `Err(Transport)` if the primary could not be reached.
    pub async fn write(&self, filename: &str, content: &str) -> Result<Response, AgentError> {
        let primary = self.primary_for(filename)?;
        tracing::info!("Sending write for {} to primary {}", filename, primary.id);

        self.send(
            primary,
            &Request::Write {
                filename: filename.to_string(),
                content: content.to_string(),
            },
        )
        .await
    }

    /// Sends REGISTER to every node. Failures are logged and otherwise ignored.
    ///
    /// Returns how many nodes accepted the registration.
    pub async fn register_with_nodes(&self) -> usize {
        let request = Request::Register {
            host: self.host.clone(),
            port: self.port,
        };

        let mut registered = 0;
        for node in self.config.nodes.iter() {
            match self.send(node, &request).await {
                Ok(response) if response.is_ok() => registered += 1,
                Ok(response) => {
                    tracing::debug!(
                        "Registration refused by {}: {}",
                        node.id,
                        response.message_or_default()
                    )
                }
                Err(e) => tracing::debug!("Registration with {} skipped: {}", node.id, e),
            }
        }
        registered
    }

    /// Drops the cached copy of `filename`, if any.
    pub async fn invalidate(&self, filename: &str) -> std::io::Result<bool> {
        let removed = self.cache.remove(filename).await?;
        if removed {
            tracing::info!("[Notification] Cache invalidated for {}", filename);
        }
        // No subscribers is fine.
        let _ = self.invalidations.send(filename.to_string());
        Ok(removed)
    }

    /// Binds the advertised address, starts the listener and registers with every node.
    pub async fn start(self: Arc<Self>) -> Result<JoinHandle<()>> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Client started on port {}", self.port);

        let agent = self.clone();
        let handle = tokio::spawn(async move {
            agent.listen_for_invalidations(listener).await;
        });

        let registered = self.register_with_nodes().await;
        tracing::info!(
            "Registered with {}/{} nodes",
            registered,
            self.config.nodes.len()
        );

        Ok(handle)
    }

    /// Accept loop for node → client notifications.
    pub async fn listen_for_invalidations(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let agent = self.clone();
                    tokio::spawn(async move {
                        agent.handle_notification(stream).await;
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept notification: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn handle_notification(&self, mut stream: TcpStream) {
        match transport::read_request(&mut stream, self.transport.max_message_size).await {
            Ok(Request::Invalidate { filename }) => {
                if let Err(e) = self.invalidate(&filename).await {
                    tracing::warn!("Failed to invalidate {}: {}", filename, e);
                }
            }
            Ok(other) => tracing::debug!("Ignoring {} on notification port", other.command()),
            Err(InboundError::Empty) => {}
            Err(e) => tracing::warn!("Bad notification: {}", e),
        }
    }

    fn primary_for(&self, filename: &str) -> Result<&NodeDescriptor, AgentError> {
        self.config
            .primary_for(filename)
            .ok_or_else(|| AgentError::NoPrimary(filename.to_string()))
    }

    async fn send(&self, node: &NodeDescriptor, request: &Request) -> Result<Response, AgentError> {
        transport::exchange(&node.addr(), request, &self.transport)
            .await
            .map_err(|source| AgentError::Transport {
                node: node.id.clone(),
                source,
            })
    }
}
