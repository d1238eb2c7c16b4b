//! Static Cluster Topology
//!
//! Everything every process in the cluster must agree on before it starts:
//! the node set, the filename → primary ownership map, and the quorum rule.
//!
//! ## Core Concepts
//! - **NodeSet**: A fixed, ordered list of storage nodes. Membership never changes at runtime.
//! - **Ownership**: Each known filename has exactly one primary node, the only node allowed to accept writes for it.
//! - **Quorum**: The number of acknowledging replicas (primary included) a write needs before it is reported as durable.

pub mod config;
pub mod ownership;
pub mod types;
