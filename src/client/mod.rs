//! Client Cache Agent
//!
//! The client side of the file store. Reads go through a local on-disk cache
//! and fall back to the file's primary node on a miss; writes always go
//! straight to the primary. Cached entries are only ever dropped by
//! INVALIDATE notices pushed from nodes the agent registered with.
//!
//! ## Submodules
//! - **`agent`**: The `CacheAgent` itself: read/write paths, registration and the invalidation listener.
//! - **`types`**: Read outcomes, source tags and the agent's error type.

pub mod agent;
pub mod types;

#[cfg(test)]
mod tests;
