//! Client Registry
//!
//! The set of client endpoints a node pushes invalidations to. Entries are
//! added by REGISTER and are never expired or removed, so a client that goes
//! away stays registered (and silently fails every later notification).

use dashmap::DashSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientEndpoint {
    pub host: String,
    pub port: u16,
}

impl ClientEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Thread-safe endpoint set shared by all connection tasks of a node.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashSet<ClientEndpoint>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `endpoint`. Returns `false` if it was already registered.
    pub fn register(&self, endpoint: ClientEndpoint) -> bool {
        let inserted = self.clients.insert(endpoint.clone());
        if inserted {
            tracing::info!("Registered client {} for invalidation", endpoint.addr());
        } else {
            tracing::debug!("Client {} already registered", endpoint.addr());
        }
        inserted
    }

    pub fn contains(&self, endpoint: &ClientEndpoint) -> bool {
        self.clients.contains(endpoint)
    }

    /// Point-in-time copy of the registered endpoints, sorted.
    ///
    /// A registration racing this call may or may not be included.
    pub fn snapshot(&self) -> Vec<ClientEndpoint> {
        let mut endpoints: Vec<ClientEndpoint> =
            self.clients.iter().map(|entry| entry.key().clone()).collect();
        endpoints.sort();
        endpoints
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
