//! Storage Node Module
//!
//! Implements the server side of the file store: a per-node disk shard,
//! single-primary write enforcement, synchronous quorum-gated replication and
//! invalidation fan-out to registered clients.
//!
//! ## Core Concepts
//! - **Shard**: Each node keeps its copies in its own directory (`DiskStore`). It is the only writer of it.
//! - **Primary**: Only the node named by the ownership map accepts WRITE for a file. Others refuse and name the primary.
//! - **Replication**: The primary pushes every accepted write to all peers and counts acknowledgments against the quorum.
//! - **Invalidation**: After a quorum write, every registered client is told to drop its cached copy.

pub mod disk;
pub mod handlers;
pub mod node;
pub mod registry;
