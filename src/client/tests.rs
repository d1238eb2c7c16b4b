//! Client Module Tests
//!
//! End-to-end checks of the cache agent against loopback clusters.
//!
//! ## Test Scopes
//! - **Read path**: Cold reads come from the primary, warm reads from the cache,
//!   failures are never cached.
//! - **Write path**: Pass-through to the primary, no network traffic for unmapped files.
//! - **Invalidation**: Quorum writes evict stale entries from every registered client.

#[cfg(test)]
mod tests {
    use crate::client::agent::CacheAgent;
    use crate::client::types::{AgentError, ReadSource};
    use crate::cluster::config::ClusterConfig;
    use crate::cluster::ownership::OwnershipMap;
    use crate::cluster::types::{NodeDescriptor, NodeSet};
    use crate::protocol::transport::notify;
    use crate::protocol::types::Request;
    use crate::test_support::{ClusterBuilder, eventually};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct TestAgent {
        agent: Arc<CacheAgent>,
        listener: JoinHandle<()>,
        _dir: TempDir,
    }

    impl Drop for TestAgent {
        fn drop(&mut self) {
            self.listener.abort();
        }
    }

    async fn start_agent(config: Arc<ClusterConfig>) -> TestAgent {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let dir = TempDir::new().unwrap();

        let agent = CacheAgent::open("127.0.0.1", port, config, dir.path())
            .await
            .unwrap();
        let listening = agent.clone();
        let handle = tokio::spawn(async move { listening.listen_for_invalidations(listener).await });
        agent.register_with_nodes().await;

        TestAgent {
            agent,
            listener: handle,
            _dir: dir,
        }
    }

    // ============================================================
    // READ / WRITE SCENARIOS
    // ============================================================

    #[tokio::test]
    async fn test_write_then_cold_and_warm_reads() {
        let cluster = ClusterBuilder::new(&["N1", "N2", "N3"])
            .owns("a.txt", "N1")
            .start()
            .await;
        let client = start_agent(cluster.config.clone()).await;
        let mut notices = client.agent.subscribe_invalidations();

        let response = client.agent.write("a.txt", "v1").await.unwrap();
        assert!(response.is_ok());
        // The write's own invalidation must land before the cache is warmed.
        tokio::time::timeout(Duration::from_secs(2), notices.recv())
            .await
            .unwrap()
            .unwrap();

        let first = client.agent.read("a.txt").await.unwrap();
        assert_eq!(first.content, "v1");
        assert_eq!(first.source, ReadSource::FromServer);

        let second = client.agent.read("a.txt").await.unwrap();
        assert_eq!(second.content, "v1");
        assert_eq!(second.source, ReadSource::CacheHit);
    }

    #[tokio::test]
    async fn test_second_write_invalidates_stale_entry() {
        let cluster = ClusterBuilder::new(&["N1", "N2", "N3"])
            .owns("a.txt", "N1")
            .start()
            .await;
        let client = start_agent(cluster.config.clone()).await;
        let mut notices = client.agent.subscribe_invalidations();

        client.agent.write("a.txt", "v1").await.unwrap();
        // Drain the notice for v1 so the next one belongs to v2.
        tokio::time::timeout(Duration::from_secs(2), notices.recv())
            .await
            .unwrap()
            .unwrap();
        client.agent.read("a.txt").await.unwrap();
        assert!(client.agent.cache().contains("a.txt").await.unwrap());

        let response = client.agent.write("a.txt", "v2").await.unwrap();
        assert!(response.is_ok());

        let notice = tokio::time::timeout(Duration::from_secs(2), notices.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice, "a.txt");
        assert!(!client.agent.cache().contains("a.txt").await.unwrap());

        let next = client.agent.read("a.txt").await.unwrap();
        assert_eq!(next.content, "v2");
        assert_eq!(next.source, ReadSource::FromServer);
    }

    #[tokio::test]
    async fn test_every_registered_client_is_invalidated() {
        let cluster = ClusterBuilder::new(&["N1", "N2"])
            .owns("a.txt", "N1")
            .start()
            .await;
        let first = start_agent(cluster.config.clone()).await;
        let second = start_agent(cluster.config.clone()).await;

        first.agent.write("a.txt", "v1").await.unwrap();
        first.agent.read("a.txt").await.unwrap();
        second.agent.read("a.txt").await.unwrap();

        first.agent.write("a.txt", "v2").await.unwrap();

        for client in [&first, &second] {
            let cache = client.agent.cache().clone();
            let evicted = eventually(|| {
                let cache = cache.clone();
                async move { !cache.contains("a.txt").await.unwrap() }
            })
            .await;
            assert!(evicted, "client on port {} kept a stale entry", client.agent.port);
        }
    }

    #[tokio::test]
    async fn test_write_is_not_applied_to_cache() {
        let cluster = ClusterBuilder::new(&["N1", "N2"])
            .owns("a.txt", "N1")
            .start()
            .await;
        let client = start_agent(cluster.config.clone()).await;

        client.agent.write("a.txt", "v1").await.unwrap();

        assert!(!client.agent.cache().contains("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_quorum_failure_passes_through_verbatim() {
        let cluster = ClusterBuilder::new(&["N1", "N2", "N3"])
            .owns("a.txt", "N1")
            .quorum(3)
            .offline("N3")
            .start()
            .await;
        let client = start_agent(cluster.config.clone()).await;

        let response = client.agent.write("a.txt", "v1").await.unwrap();

        assert!(!response.is_ok());
        assert_eq!(response.message.as_deref(), Some("Quorum failed"));
    }

    #[tokio::test]
    async fn test_read_error_is_not_cached() {
        let cluster = ClusterBuilder::new(&["N1", "N2"])
            .owns("a.txt", "N1")
            .start()
            .await;
        let client = start_agent(cluster.config.clone()).await;

        let result = client.agent.read("a.txt").await;

        match result {
            Err(AgentError::Server(message)) => assert_eq!(message, "File not found"),
            other => panic!("expected server error, got {:?}", other),
        }
        assert!(!client.agent.cache().contains("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_unmapped_file_fails_locally() {
        let cluster = ClusterBuilder::new(&["N1"]).quorum(1).start().await;
        let client = start_agent(cluster.config.clone()).await;

        let result = client.agent.read("nobody.txt").await;

        assert!(matches!(result, Err(AgentError::NoPrimary(_))));
    }

    #[tokio::test]
    async fn test_read_of_path_like_unmapped_name_reports_no_primary() {
        let cluster = ClusterBuilder::new(&["N1"]).quorum(1).start().await;
        let client = start_agent(cluster.config.clone()).await;

        let result = client.agent.read("sub/x.txt").await;

        match result {
            Err(AgentError::NoPrimary(filename)) => assert_eq!(filename, "sub/x.txt"),
            other => panic!("expected NoPrimary, got {:?}", other.map(|o| o.content)),
        }
    }

    #[tokio::test]
    async fn test_write_unmapped_file_makes_no_network_call() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config = ClusterConfig::default();
        config.nodes = NodeSet::new(vec![NodeDescriptor::new("N1", "127.0.0.1", port)]);
        config.ownership = OwnershipMap::new();
        config.quorum = 1;
        let dir = TempDir::new().unwrap();
        let agent = CacheAgent::open("127.0.0.1", 0, Arc::new(config), dir.path())
            .await
            .unwrap();

        let result = agent.write("nobody.txt", "v1").await;

        assert!(matches!(result, Err(AgentError::NoPrimary(_))));
        let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err(), "no connection should reach the node");
    }

    #[tokio::test]
    async fn test_unreachable_primary_is_soft_failure() {
        let cluster = ClusterBuilder::new(&["N1", "N2"])
            .owns("a.txt", "N1")
            .offline("N1")
            .start()
            .await;
        let client = start_agent(cluster.config.clone()).await;

        let read = client.agent.read("a.txt").await;
        let write = client.agent.write("a.txt", "v1").await;

        assert!(matches!(read, Err(AgentError::Transport { .. })));
        assert!(matches!(write, Err(AgentError::Transport { .. })));
    }

    // ============================================================
    // REGISTRATION / LISTENER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_registration_skips_unreachable_nodes() {
        let cluster = ClusterBuilder::new(&["N1", "N2", "N3"])
            .offline("N2")
            .start()
            .await;
        let client = start_agent(cluster.config.clone()).await;

        let registered = client.agent.register_with_nodes().await;

        assert_eq!(registered, 2);
        assert_eq!(cluster.node("N1").clients().len(), 1);
        assert_eq!(cluster.node("N3").clients().len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let agent = CacheAgent::open(
            "127.0.0.1",
            0,
            Arc::new(ClusterConfig::default()),
            dir.path(),
        )
        .await
        .unwrap();
        agent.cache().write("a.txt", "stale").await.unwrap();

        assert!(agent.invalidate("a.txt").await.unwrap());
        assert!(!agent.invalidate("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_listener_ignores_other_commands() {
        let cluster = ClusterBuilder::new(&["N1"]).quorum(1).start().await;
        let client = start_agent(cluster.config.clone()).await;
        client.agent.cache().write("a.txt", "kept").await.unwrap();
        let addr = format!("127.0.0.1:{}", client.agent.port);

        notify(
            &addr,
            &Request::Read {
                filename: "a.txt".to_string(),
            },
            &Default::default(),
        )
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(client.agent.cache().contains("a.txt").await.unwrap());
    }
}
