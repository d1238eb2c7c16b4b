//! Quorum-Replicated File Store
//!
//! This library crate defines the modules shared by the storage node binary,
//! the interactive client and the HTTP façade.
//!
//! ## Architecture Modules
//! The system is composed of four layers:
//!
//! - **`protocol`**: The wire format (one JSON message per TCP connection) and the
//!   transport helpers both nodes and clients use to exchange it.
//! - **`cluster`**: The static topology: node set, filename → primary ownership map,
//!   quorum size and transport limits.
//! - **`storage`**: The storage node. Owns a disk shard, accepts writes only for files it
//!   is primary of, replicates them under the quorum rule and pushes cache invalidations.
//! - **`client`**: The cache agent. Read-through local cache, write pass-through to the
//!   primary and a listener that drops cached entries on INVALIDATE.

pub mod client;
pub mod cluster;
pub mod protocol;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
