use super::node::{StorageError, StorageNode};
use crate::protocol::transport::{self, InboundError};
use crate::protocol::types::{Request, Response};

use std::sync::Arc;
use tokio::net::TcpStream;

/// Serves exactly one exchange on an accepted connection, then closes it.
pub async fn handle_connection(node: Arc<StorageNode>, mut stream: TcpStream) {
    let max = node.transport().max_message_size;

    let response = match transport::read_request(&mut stream, max).await {
        Ok(request) => dispatch(&node, request).await,
        Err(InboundError::Empty) => return,
        Err(e) => {
            tracing::error!("[{}] Error: {}", node.id(), e);
            Response::error(e.to_string())
        }
    };

    if let Err(e) = transport::write_response(&mut stream, &response).await {
        tracing::error!("[{}] Failed to send response: {}", node.id(), e);
    }
}

pub async fn dispatch(node: &StorageNode, request: Request) -> Response {
    tracing::debug!(
        "[{}] {} {}",
        node.id(),
        request.command(),
        request.filename().unwrap_or_default()
    );

    match request {
        Request::Read { filename } => handle_read(node, &filename).await,
        Request::Write { filename, content } => handle_write(node, &filename, &content).await,
        Request::Replicate { filename, content } => {
            handle_replicate(node, &filename, &content).await
        }
        Request::Register { host, port } => handle_register(node, &host, port),
        Request::Invalidate { .. } => Response::error("Unknown command"),
    }
}

pub async fn handle_read(node: &StorageNode, filename: &str) -> Response {
    match node.read_local(filename).await {
        Ok(content) => Response::ok_with_content(content),
        Err(StorageError::NotFound) => Response::error(StorageError::NotFound.to_string()),
        Err(e) => {
            tracing::error!("[{}] Failed to read {}: {}", node.id(), filename, e);
            Response::error(e.to_string())
        }
    }
}

pub async fn handle_write(node: &StorageNode, filename: &str, content: &str) -> Response {
    match node.write_as_primary(filename, content).await {
        Ok(outcome) => {
            tracing::info!("[{}] {} for {}", node.id(), outcome, filename);
            Response::ok_with_message(outcome.to_string())
        }
        Err(e) => Response::error(e.to_string()),
    }
}

pub async fn handle_replicate(node: &StorageNode, filename: &str, content: &str) -> Response {
    match node.store_replica(filename, content).await {
        Ok(()) => Response::ok(),
        Err(e) => {
            tracing::error!("[{}] Failed to store replica: {}", node.id(), e);
            Response::error(e.to_string())
        }
    }
}

pub fn handle_register(node: &StorageNode, host: &str, port: u16) -> Response {
    node.register_client(host, port);
    Response::ok_with_message("Registered for invalidation")
}
