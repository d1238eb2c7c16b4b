//! Request and response envelopes.

use serde::{Deserialize, Serialize};

/// A request sent to a storage node, or a notification pushed to a client.
///
/// The `command` field selects the variant; the remaining fields are the
/// variant's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "UPPERCASE")]
pub enum Request {
    /// Ask a node to push invalidations to `host:port` after every quorum write.
    Register { host: String, port: u16 },
    /// Read a node's local copy. Never forwarded to another node.
    Read { filename: String },
    /// Write through the file's primary.
    Write { filename: String, content: String },
    /// Primary → peer copy of an accepted write.
    Replicate { filename: String, content: String },
    /// Node → client notice to drop a cached copy. Fire-and-forget.
    Invalidate { filename: String },
}

impl Request {
    pub fn command(&self) -> &'static str {
        match self {
            Request::Register { .. } => "REGISTER",
            Request::Read { .. } => "READ",
            Request::Write { .. } => "WRITE",
            Request::Replicate { .. } => "REPLICATE",
            Request::Invalidate { .. } => "INVALIDATE",
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            Request::Register { .. } => None,
            Request::Read { filename }
            | Request::Write { filename, .. }
            | Request::Replicate { filename, .. }
            | Request::Invalidate { filename } => Some(filename),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// The single reply to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            content: None,
            message: None,
        }
    }

    pub fn ok_with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::ok()
        }
    }

    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            content: None,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The message field, or an empty string when the node sent none.
    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}
